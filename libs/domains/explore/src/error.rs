use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;
use transport::{EnvelopeError, Interrupted, Reply, ReplyError, TransportError};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ExploreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    Duplicate(String),

    #[error("Explore profile incomplete: {0}")]
    ProfileIncomplete(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type ExploreResult<T> = Result<T, ExploreError>;

impl ExploreError {
    pub fn user_not_found(id: Uuid) -> Self {
        Self::NotFound(format!("user {}", id))
    }

    pub fn profile_not_found(id: Uuid) -> Self {
        Self::NotFound(format!("match profile for user {}", id))
    }

    /// Stable, machine-readable reason carried in reply envelopes and HTTP
    /// error bodies
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Duplicate(_) => "duplicate",
            Self::ProfileIncomplete(_) => "profile_incomplete",
            Self::TypeMismatch(_) => "type_mismatch",
            Self::Validation(_) => "validation",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
            Self::Upstream(_) => "upstream_failure",
            Self::Transport(e) => e.reason(),
        }
    }

    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Upstream(_) => true,
            Self::Transport(e) => e.is_retriable(),
            _ => false,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Duplicate(_) | Self::ProfileIncomplete(_) => StatusCode::CONFLICT,
            Self::TypeMismatch(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            // nginx's "client closed request"
            Self::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Transport(TransportError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Error half of a reply envelope
    pub fn to_reply(&self) -> Reply<Value> {
        Reply::err(self.reason(), self.to_string())
    }

    /// Rebuild a taxonomy error from a reply received over the transport
    pub fn from_reply(reply: ReplyError) -> Self {
        let ReplyError { reason, message } = reply;
        match reason.as_str() {
            "not_found" => Self::NotFound(message),
            "duplicate" => Self::Duplicate(message),
            "profile_incomplete" => Self::ProfileIncomplete(message),
            "type_mismatch" | "unknown_type" => Self::TypeMismatch(message),
            "validation" | "malformed_envelope" => Self::Validation(message),
            "timeout" => Self::Timeout(message),
            "cancelled" => Self::Cancelled,
            _ => Self::Upstream(format!("{}: {}", reason, message)),
        }
    }
}

impl IntoResponse for ExploreError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, reason = self.reason(), "explore request failed");
        }

        let body = Json(json!({
            "error": {
                "type": self.reason(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<EnvelopeError> for ExploreError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::UnknownType(_) | EnvelopeError::TypeMismatch { .. } => {
                Self::TypeMismatch(err.to_string())
            }
            EnvelopeError::Malformed(_) => Self::Validation(err.to_string()),
            EnvelopeError::Encode(_) => Self::Upstream(err.to_string()),
        }
    }
}

impl From<Interrupted> for ExploreError {
    fn from(err: Interrupted) -> Self {
        match err {
            Interrupted::Cancelled => Self::Cancelled,
            Interrupted::DeadlineExceeded => Self::Timeout("store operation".to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ExploreError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

fn is_timed_out(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::TimedOut
}

impl From<mongodb::error::Error> for ExploreError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        match err.kind.as_ref() {
            ErrorKind::Io(io) if is_timed_out(io) => Self::Timeout(format!("mongodb: {}", err)),
            ErrorKind::ServerSelection { .. } => Self::Timeout(format!("mongodb: {}", err)),
            _ => Self::Upstream(format!("mongodb: {}", err)),
        }
    }
}

impl From<redis::RedisError> for ExploreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("redis: {}", err))
        } else {
            Self::Upstream(format!("redis: {}", err))
        }
    }
}

impl From<qdrant_client::QdrantError> for ExploreError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        use qdrant_client::QdrantError;

        match &err {
            QdrantError::ResponseError { status }
                if status.code() == tonic::Code::DeadlineExceeded =>
            {
                Self::Timeout(format!("qdrant: {}", err))
            }
            QdrantError::Io(io) if is_timed_out(io) => Self::Timeout(format!("qdrant: {}", err)),
            _ => Self::Upstream(format!("qdrant: {}", err)),
        }
    }
}

impl From<serde_json::Error> for ExploreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Upstream(format!("json: {}", err))
    }
}
