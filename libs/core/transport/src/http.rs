//! HTTP invocation: one POST per call to the consumer's registered endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument, warn};

use crate::config::TransportConfig;
use crate::consumer::{Consumer, ConsumerMap};
use crate::context::{CallContext, Interrupted};
use crate::error::{TransportError, TransportResult};
use crate::invoke::{INVOCATION_TYPE_HEADER, InvocationType, Transport};

/// [`Transport`] backed by `reqwest`.
///
/// Cheap to clone; the connection pool and consumer map are shared.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    consumers: Arc<ConsumerMap>,
    config: TransportConfig,
}

impl HttpTransport {
    pub fn new(consumers: Arc<ConsumerMap>, config: TransportConfig) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self::with_client(client, consumers, config))
    }

    /// Reuse an existing client
    pub fn with_client(
        client: reqwest::Client,
        consumers: Arc<ConsumerMap>,
        config: TransportConfig,
    ) -> Self {
        Self {
            client,
            consumers,
            config,
        }
    }

    pub fn consumers(&self) -> &ConsumerMap {
        &self.consumers
    }

    fn effective_timeout(&self, ctx: &CallContext) -> Option<Duration> {
        match ctx.remaining() {
            Some(left) if left.is_zero() => None,
            Some(left) => Some(left.min(self.config.timeout)),
            None => Some(self.config.timeout),
        }
    }

    async fn invoke(
        &self,
        ctx: &CallContext,
        consumer: Consumer,
        kind: InvocationType,
        payload: Vec<u8>,
    ) -> TransportResult<Vec<u8>> {
        let endpoint = self.consumers.resolve(consumer)?;

        if ctx.is_cancelled() {
            return Err(TransportError::Cancelled { consumer });
        }
        let Some(timeout) = self.effective_timeout(ctx) else {
            return Err(TransportError::Timeout { consumer });
        };

        let call = self.send(consumer, endpoint, kind, timeout, payload);
        match ctx.run(call).await {
            Ok(result) => result,
            Err(Interrupted::Cancelled) => Err(TransportError::Cancelled { consumer }),
            Err(Interrupted::DeadlineExceeded) => Err(TransportError::Timeout { consumer }),
        }
    }

    async fn send(
        &self,
        consumer: Consumer,
        endpoint: &str,
        kind: InvocationType,
        timeout: Duration,
        payload: Vec<u8>,
    ) -> TransportResult<Vec<u8>> {
        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(INVOCATION_TYPE_HEADER, kind.as_str())
            .timeout(timeout)
            .body(payload)
            .send()
            .await
            .map_err(|e| classify_send_error(consumer, endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%consumer, status = %status, "invocation returned non-success status");
            return Err(classify_status(consumer, endpoint, status, body));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout { consumer }
            } else {
                TransportError::MalformedResponse {
                    consumer,
                    message: e.to_string(),
                }
            }
        })?;

        debug!(%consumer, status = %status, bytes = body.len(), "invocation completed");
        Ok(body.to_vec())
    }
}

fn classify_send_error(consumer: Consumer, endpoint: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout { consumer }
    } else if err.is_connect() {
        TransportError::TargetNotFound {
            consumer,
            endpoint: endpoint.to_string(),
        }
    } else {
        TransportError::upstream_with_source(consumer, "sending invocation", err)
    }
}

fn classify_status(
    consumer: Consumer,
    endpoint: &str,
    status: StatusCode,
    body: String,
) -> TransportError {
    match status {
        StatusCode::NOT_FOUND => TransportError::TargetNotFound {
            consumer,
            endpoint: endpoint.to_string(),
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            TransportError::Timeout { consumer }
        }
        s if s.is_client_error() => TransportError::Rejected {
            consumer,
            status: s.as_u16(),
            body,
        },
        s => TransportError::upstream(consumer, format!("status {}: {}", s, body)),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, ctx, payload), fields(consumer = %consumer, bytes = payload.len()))]
    async fn push(
        &self,
        ctx: &CallContext,
        consumer: Consumer,
        payload: Vec<u8>,
    ) -> TransportResult<()> {
        self.invoke(ctx, consumer, InvocationType::Event, payload)
            .await
            .map(|_| ())
    }

    #[instrument(skip(self, ctx, payload), fields(consumer = %consumer, bytes = payload.len()))]
    async fn request(
        &self,
        ctx: &CallContext,
        consumer: Consumer,
        payload: Vec<u8>,
    ) -> TransportResult<Vec<u8>> {
        self.invoke(ctx, consumer, InvocationType::RequestResponse, payload)
            .await
    }
}
