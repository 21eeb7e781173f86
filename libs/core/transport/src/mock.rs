//! In-process [`Transport`] that records calls and performs no I/O.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::consumer::Consumer;
use crate::context::CallContext;
use crate::error::{TransportError, TransportResult};
use crate::invoke::{InvocationType, Transport};

/// One call observed by [`MockTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub kind: InvocationType,
    pub consumer: Consumer,
    pub payload: Vec<u8>,
}

/// Accepts every push and answers every request with an empty body, unless a
/// canned response was registered for the consumer.
///
/// A cancelled or expired context is still honoured so that callers exercise
/// the same control flow as with [`HttpTransport`](crate::HttpTransport).
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    responses: Arc<HashMap<Consumer, Vec<u8>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests to `consumer` with `body`
    pub fn with_response(mut self, consumer: Consumer, body: impl Into<Vec<u8>>) -> Self {
        Arc::make_mut(&mut self.responses).insert(consumer, body.into());
        self
    }

    /// Every call observed so far, in order
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    fn check(ctx: &CallContext, consumer: Consumer) -> TransportResult<()> {
        if ctx.is_cancelled() {
            return Err(TransportError::Cancelled { consumer });
        }
        if ctx.is_expired() {
            return Err(TransportError::Timeout { consumer });
        }
        Ok(())
    }

    async fn record(&self, kind: InvocationType, consumer: Consumer, payload: Vec<u8>) {
        info!(
            %consumer,
            kind = kind.as_str(),
            payload = %String::from_utf8_lossy(&payload),
            "mock transport invoked"
        );
        self.calls.lock().await.push(RecordedCall {
            kind,
            consumer,
            payload,
        });
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn push(
        &self,
        ctx: &CallContext,
        consumer: Consumer,
        payload: Vec<u8>,
    ) -> TransportResult<()> {
        Self::check(ctx, consumer)?;
        self.record(InvocationType::Event, consumer, payload).await;
        Ok(())
    }

    async fn request(
        &self,
        ctx: &CallContext,
        consumer: Consumer,
        payload: Vec<u8>,
    ) -> TransportResult<Vec<u8>> {
        Self::check(ctx, consumer)?;
        self.record(InvocationType::RequestResponse, consumer, payload)
            .await;
        Ok(self.responses.get(&consumer).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_push_and_request_are_recorded() {
        let transport = MockTransport::new();
        let ctx = CallContext::background();

        transport
            .push(&ctx, Consumer::CollectingPush, b"event".to_vec())
            .await
            .unwrap();
        let reply = transport
            .request(&ctx, Consumer::Explore, b"req".to_vec())
            .await
            .unwrap();

        assert!(reply.is_empty());

        let calls = transport.calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].kind, InvocationType::Event);
        assert_eq!(calls[0].consumer, Consumer::CollectingPush);
        assert_eq!(calls[1].payload, b"req");
    }

    #[tokio::test]
    async fn test_canned_response() {
        let transport = MockTransport::new().with_response(Consumer::Explore, r#"{"data":[]}"#);

        let reply = transport
            .request(&CallContext::background(), Consumer::Explore, Vec::new())
            .await
            .unwrap();
        assert_eq!(reply, br#"{"data":[]}"#);
    }

    #[tokio::test]
    async fn test_clones_share_recordings() {
        let transport = MockTransport::new();
        let shared = transport.clone();

        shared
            .push(&CallContext::background(), Consumer::Explore, Vec::new())
            .await
            .unwrap();
        assert_eq!(transport.calls().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_honours_cancel_and_deadline() {
        let transport = MockTransport::new();

        let cancelled = CallContext::background();
        cancelled.cancel();
        assert!(matches!(
            transport.push(&cancelled, Consumer::Explore, Vec::new()).await,
            Err(TransportError::Cancelled { .. })
        ));

        let expired = CallContext::with_timeout(Duration::from_millis(1));
        tokio::time::advance(Duration::from_millis(5)).await;
        assert!(matches!(
            transport.request(&expired, Consumer::Explore, Vec::new()).await,
            Err(TransportError::Timeout { .. })
        ));

        assert!(transport.calls().await.is_empty());
    }
}
