//! Error types for envelopes and invocations.

use thiserror::Error;

use crate::consumer::Consumer;

/// Failure to decode a cross-service envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Not JSON, or no `type` field
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// The `type` tag is not one this receiver understands
    #[error("unknown envelope type: {0}")]
    UnknownType(String),

    /// The tag is known but the payload does not have that tag's shape
    #[error("payload does not match type {tag}: {reason}")]
    TypeMismatch { tag: String, reason: String },

    /// Encoding an outbound message failed
    #[error("failed to encode envelope: {0}")]
    Encode(String),
}

/// Errors raised by a [`Transport`](crate::Transport) call.
///
/// Provider errors (reqwest, status codes) are folded into these variants at
/// the transport boundary and never leak to callers.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No physical endpoint is registered for the consumer
    #[error("no endpoint registered for consumer '{0}'")]
    UnknownConsumer(Consumer),

    /// The endpoint does not exist or refused the connection
    #[error("invocation target for '{consumer}' not found at {endpoint}")]
    TargetNotFound { consumer: Consumer, endpoint: String },

    /// The call's deadline elapsed before a response arrived
    #[error("invocation of '{consumer}' timed out")]
    Timeout { consumer: Consumer },

    /// The caller cancelled the call
    #[error("invocation of '{consumer}' was cancelled")]
    Cancelled { consumer: Consumer },

    /// The target answered with a client error
    #[error("'{consumer}' rejected the invocation with status {status}: {body}")]
    Rejected {
        consumer: Consumer,
        status: u16,
        body: String,
    },

    /// The target or the network failed
    #[error("invocation of '{consumer}' failed: {message}")]
    Upstream {
        consumer: Consumer,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The target answered but the body could not be read
    #[error("malformed response from '{consumer}': {message}")]
    MalformedResponse { consumer: Consumer, message: String },

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// The HTTP client could not be constructed
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;

impl TransportError {
    pub fn upstream(consumer: Consumer, message: impl Into<String>) -> Self {
        Self::Upstream {
            consumer,
            message: message.into(),
            source: None,
        }
    }

    pub fn upstream_with_source(
        consumer: Consumer,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Upstream {
            consumer,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether repeating the same call might succeed.
    ///
    /// Timeouts and upstream failures are transient. Everything else is a
    /// configuration or contract problem that a retry will not fix.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Upstream { .. })
    }

    /// Stable, machine-readable reason string
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnknownConsumer(_) => "unknown_consumer",
            Self::TargetNotFound { .. } => "target_not_found",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled { .. } => "cancelled",
            Self::Rejected { .. } => "rejected",
            Self::Upstream { .. } => "upstream_failure",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Envelope(EnvelopeError::TypeMismatch { .. }) => "type_mismatch",
            Self::Envelope(EnvelopeError::UnknownType(_)) => "unknown_type",
            Self::Envelope(_) => "malformed_envelope",
            Self::Client(_) => "client",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        assert!(TransportError::Timeout {
            consumer: Consumer::Explore
        }
        .is_retriable());
        assert!(TransportError::upstream(Consumer::Explore, "502").is_retriable());

        assert!(!TransportError::UnknownConsumer(Consumer::Explore).is_retriable());
        assert!(!TransportError::Cancelled {
            consumer: Consumer::Explore
        }
        .is_retriable());
        assert!(!TransportError::Rejected {
            consumer: Consumer::Explore,
            status: 400,
            body: String::new(),
        }
        .is_retriable());
    }

    #[test]
    fn test_reason_strings() {
        let err = TransportError::from(EnvelopeError::TypeMismatch {
            tag: "SUGGEST".to_string(),
            reason: "missing field".to_string(),
        });
        assert_eq!(err.reason(), "type_mismatch");
        assert_eq!(
            TransportError::UnknownConsumer(Consumer::CollectingGet).reason(),
            "unknown_consumer"
        );
    }

    #[test]
    fn test_upstream_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = TransportError::upstream_with_source(Consumer::Explore, "send failed", io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("explore"));
    }
}
