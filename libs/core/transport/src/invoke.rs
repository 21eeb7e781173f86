use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::consumer::Consumer;
use crate::context::CallContext;
use crate::error::TransportResult;

/// Header telling the target which call shape it is serving
pub const INVOCATION_TYPE_HEADER: &str = "x-invocation-type";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationType {
    /// Fire-and-forget
    Event,
    /// Caller waits for the reply body
    RequestResponse,
}

impl InvocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvocationType::Event => "Event",
            InvocationType::RequestResponse => "RequestResponse",
        }
    }
}

impl FromStr for InvocationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Event" => Ok(InvocationType::Event),
            "RequestResponse" => Ok(InvocationType::RequestResponse),
            other => Err(format!("unknown invocation type '{}'", other)),
        }
    }
}

/// Invoke a logical consumer by name.
///
/// Implementations resolve `consumer` through their own registry. The payload
/// is opaque bytes; callers encode it with [`encode`](crate::encode).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fire-and-forget. `Ok` means the target accepted the invocation, not
    /// that it finished processing.
    async fn push(&self, ctx: &CallContext, consumer: Consumer, payload: Vec<u8>)
    -> TransportResult<()>;

    /// Call-and-wait. Returns the raw response body.
    async fn request(
        &self,
        ctx: &CallContext,
        consumer: Consumer,
        payload: Vec<u8>,
    ) -> TransportResult<Vec<u8>>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn push(
        &self,
        ctx: &CallContext,
        consumer: Consumer,
        payload: Vec<u8>,
    ) -> TransportResult<()> {
        (**self).push(ctx, consumer, payload).await
    }

    async fn request(
        &self,
        ctx: &CallContext,
        consumer: Consumer,
        payload: Vec<u8>,
    ) -> TransportResult<Vec<u8>> {
        (**self).request(ctx, consumer, payload).await
    }
}
