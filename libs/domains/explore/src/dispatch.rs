//! Route decoded envelopes to the service.

use serde::Serialize;
use serde_json::Value;
use tracing::{instrument, warn};
use transport::{CallContext, Message, Reply};

use crate::error::ExploreResult;
use crate::protocol::{ExploreEvent, ExploreRequest};
use crate::service::ExploreService;

fn to_value<T: Serialize>(value: T) -> ExploreResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Serve one request. Domain failures travel inside the reply.
#[instrument(skip_all, fields(tag = request.tag()))]
pub async fn dispatch_request(
    ctx: &CallContext,
    service: &ExploreService,
    request: ExploreRequest,
) -> Reply<Value> {
    let result = match request {
        ExploreRequest::AddUserMatchInfo(input) => service
            .add_user_match_information(ctx, input)
            .await
            .and_then(to_value),
        ExploreRequest::Suggest(payload) => service
            .suggest(ctx, payload.user_id)
            .await
            .and_then(to_value),
        ExploreRequest::AddEmbedding(payload) => service
            .add_embedding(ctx, payload.user_id, payload.embed)
            .await
            .map(|()| Value::Null),
    };

    match result {
        Ok(data) => Reply::ok(data),
        Err(err) => {
            warn!(error = %err, reason = err.reason(), "request failed");
            err.to_reply()
        }
    }
}

/// Process one event. Nobody is waiting for the outcome, so the caller
/// only logs it.
#[instrument(skip_all, fields(tag = event.tag()))]
pub async fn dispatch_event(
    ctx: &CallContext,
    service: &ExploreService,
    event: ExploreEvent,
) -> ExploreResult<()> {
    match event {
        ExploreEvent::AddEmbedding(payload) => {
            service
                .add_embedding(ctx, payload.user_id, payload.embed)
                .await
        }
        ExploreEvent::AddUserMatchInfo(input) => service
            .add_user_match_information(ctx, input)
            .await
            .map(|_| ()),
    }
}
