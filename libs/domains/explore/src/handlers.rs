use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::{Value, json};
use transport::{CallContext, INVOCATION_TYPE_HEADER, InvocationType, Reply, decode};
use utoipa::OpenApi;
use uuid::Uuid;

use crate::dispatch::{dispatch_event, dispatch_request};
use crate::error::{ExploreError, ExploreResult};
use crate::models::{EmbeddingBody, MatchInfo, NewMatchInfo};
use crate::protocol::{ExploreEvent, ExploreRequest};
use crate::service::ExploreService;

/// OpenAPI documentation for the direct HTTP routes
#[derive(OpenApi)]
#[openapi(
    paths(suggest, add_match_info, put_embedding),
    components(schemas(MatchInfo, NewMatchInfo, EmbeddingBody)),
    tags(
        (name = "Explore", description = "Match profiles, embeddings and suggestions")
    )
)]
pub struct ApiDoc;

/// Explore router: the `/invoke` target plus direct HTTP routes
pub fn router(service: ExploreService) -> Router {
    Router::new()
        .route("/invoke", post(invoke))
        .route("/suggest/{user_id}", get(suggest))
        .route("/match-info", post(add_match_info))
        .route("/embeddings/{user_id}", put(put_embedding))
        .route("/health", get(health))
        .with_state(Arc::new(service))
}

fn invocation_type(headers: &HeaderMap) -> InvocationType {
    headers
        .get(INVOCATION_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(InvocationType::RequestResponse)
}

fn bad_envelope(err: ExploreError) -> Response {
    (StatusCode::BAD_REQUEST, Json(err.to_reply())).into_response()
}

/// Transport target. Requests are answered with a reply envelope; events are
/// acknowledged with 202 and processed in the background.
async fn invoke(
    State(service): State<Arc<ExploreService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match invocation_type(&headers) {
        InvocationType::Event => {
            let event = match decode::<ExploreEvent>(&body) {
                Ok(event) => event,
                Err(e) => return bad_envelope(e.into()),
            };

            tokio::spawn(async move {
                let ctx = CallContext::background();
                if let Err(err) = dispatch_event(&ctx, &service, event).await {
                    tracing::warn!(error = %err, reason = err.reason(), "event processing failed");
                }
            });

            StatusCode::ACCEPTED.into_response()
        }
        InvocationType::RequestResponse => {
            let request = match decode::<ExploreRequest>(&body) {
                Ok(request) => request,
                Err(e) => return bad_envelope(e.into()),
            };

            let ctx = CallContext::background();
            let reply: Reply<Value> = dispatch_request(&ctx, &service, request).await;
            (StatusCode::OK, Json(reply)).into_response()
        }
    }
}

/// Suggest matches for a user
#[utoipa::path(
    get,
    path = "/suggest/{user_id}",
    tag = "Explore",
    params(("user_id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Suggested users, most similar first", body = Vec<MatchInfo>),
        (status = 404, description = "User or profile not found"),
        (status = 409, description = "Profile has no embedding yet"),
        (status = 408, description = "A store did not answer in time")
    )
)]
async fn suggest(
    State(service): State<Arc<ExploreService>>,
    Path(user_id): Path<Uuid>,
) -> ExploreResult<Json<Vec<MatchInfo>>> {
    let ctx = CallContext::background();
    Ok(Json(service.suggest(&ctx, user_id).await?))
}

/// Create a match profile
#[utoipa::path(
    post,
    path = "/match-info",
    tag = "Explore",
    request_body = NewMatchInfo,
    responses(
        (status = 201, description = "Profile created", body = MatchInfo),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Profile already exists"),
        (status = 408, description = "A store did not answer in time")
    )
)]
async fn add_match_info(
    State(service): State<Arc<ExploreService>>,
    Json(input): Json<NewMatchInfo>,
) -> ExploreResult<impl IntoResponse> {
    let ctx = CallContext::background();
    let info = service.add_user_match_information(&ctx, input).await?;
    Ok((StatusCode::CREATED, Json(info)))
}

/// Store or replace a user's embedding
#[utoipa::path(
    put,
    path = "/embeddings/{user_id}",
    tag = "Explore",
    params(("user_id" = Uuid, Path, description = "User id")),
    request_body = EmbeddingBody,
    responses(
        (status = 204, description = "Embedding stored"),
        (status = 400, description = "Wrong dimension"),
        (status = 404, description = "Profile not found"),
        (status = 408, description = "A store did not answer in time")
    )
)]
async fn put_embedding(
    State(service): State<Arc<ExploreService>>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<EmbeddingBody>,
) -> ExploreResult<StatusCode> {
    let ctx = CallContext::background();
    service.add_embedding(&ctx, user_id, body.embed).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
