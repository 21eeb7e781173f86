//! Caller-side helper for invoking explore through a [`Transport`].

use serde::de::DeserializeOwned;
use tracing::instrument;
use transport::{CallContext, Consumer, Transport, TransportError, decode_reply, encode};
use uuid::Uuid;

use crate::error::{ExploreError, ExploreResult};
use crate::models::{EmbeddingVector, MatchInfo, NewMatchInfo};
use crate::protocol::{EmbeddingPayload, ExploreEvent, ExploreRequest, SuggestPayload};

/// Typed explore calls over any transport.
///
/// ```ignore
/// let client = ExploreClient::new(HttpTransport::new(consumers, TransportConfig::default())?);
/// let info = client.add_user_match_info(&ctx, new_info).await?;
/// ```
#[derive(Clone)]
pub struct ExploreClient<T: Transport> {
    transport: T,
}

impl<T: Transport> ExploreClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `request` and decode the reply. `None` means the target
    /// acknowledged with an empty body, which is what the no-op
    /// [`MockTransport`](transport::MockTransport) does.
    async fn call<R: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        request: ExploreRequest,
    ) -> ExploreResult<Option<R>> {
        let payload = encode(&request)?;
        let bytes = self
            .transport
            .request(ctx, Consumer::Explore, payload)
            .await?;

        if bytes.is_empty() {
            return Ok(None);
        }

        let reply = decode_reply::<R>(&bytes).map_err(|e| {
            ExploreError::Transport(TransportError::MalformedResponse {
                consumer: Consumer::Explore,
                message: e.to_string(),
            })
        })?;

        reply.into_result().map(Some).map_err(ExploreError::from_reply)
    }

    /// Without a reply body the profile is built locally from `input`
    #[instrument(skip(self, ctx, input), fields(user_id = %input.user_id))]
    pub async fn add_user_match_info(
        &self,
        ctx: &CallContext,
        input: NewMatchInfo,
    ) -> ExploreResult<MatchInfo> {
        let info = self
            .call(ctx, ExploreRequest::AddUserMatchInfo(input.clone()))
            .await?;
        Ok(info.unwrap_or_else(|| MatchInfo::new(input)))
    }

    #[instrument(skip(self, ctx))]
    pub async fn suggest(&self, ctx: &CallContext, user_id: Uuid) -> ExploreResult<Vec<MatchInfo>> {
        let suggestions = self
            .call(ctx, ExploreRequest::Suggest(SuggestPayload { user_id }))
            .await?;
        Ok(suggestions.unwrap_or_default())
    }

    #[instrument(skip(self, ctx, embed))]
    pub async fn add_embedding(
        &self,
        ctx: &CallContext,
        user_id: Uuid,
        embed: EmbeddingVector,
    ) -> ExploreResult<()> {
        self.call::<()>(
            ctx,
            ExploreRequest::AddEmbedding(EmbeddingPayload { user_id, embed }),
        )
        .await?;
        Ok(())
    }

    /// Fire-and-forget variant of [`ExploreClient::add_embedding`]
    #[instrument(skip(self, ctx, embed))]
    pub async fn push_embedding(
        &self,
        ctx: &CallContext,
        user_id: Uuid,
        embed: EmbeddingVector,
    ) -> ExploreResult<()> {
        let payload = encode(&ExploreEvent::AddEmbedding(EmbeddingPayload { user_id, embed }))?;
        self.transport
            .push(ctx, Consumer::Explore, payload)
            .await?;
        Ok(())
    }
}
