//! Wire format for cross-service messages.
//!
//! Requests and events travel as `{"type": <tag>, "payload": <shape>}`. The
//! key `data` is accepted in place of `payload`. Each receiver declares its
//! messages as a closed enum:
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! #[serde(tag = "type", content = "payload")]
//! enum ExploreRequest {
//!     #[serde(rename = "SUGGEST")]
//!     Suggest(SuggestPayload),
//! }
//! ```
//!
//! Replies travel as `{"data": <T>}` or
//! `{"error": {"reason": <stable string>, "message": <text>}}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EnvelopeError;

/// A closed family of tagged messages.
pub trait Message: Serialize + DeserializeOwned {
    /// Every tag the family understands
    const TAGS: &'static [&'static str];

    /// Tag of this value
    fn tag(&self) -> &'static str;
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, alias = "data")]
    payload: Value,
}

/// Serialize a message into its envelope bytes
pub fn encode<M: Message>(message: &M) -> Result<Vec<u8>, EnvelopeError> {
    serde_json::to_vec(message).map_err(|e| EnvelopeError::Encode(e.to_string()))
}

/// Decode envelope bytes into one variant of `M`.
///
/// An unknown tag is [`EnvelopeError::UnknownType`]. A known tag whose
/// payload does not decode as that tag's shape is
/// [`EnvelopeError::TypeMismatch`].
pub fn decode<M: Message>(bytes: &[u8]) -> Result<M, EnvelopeError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
    decode_value(value)
}

/// Same as [`decode`] for an already parsed JSON value
pub fn decode_value<M: Message>(value: Value) -> Result<M, EnvelopeError> {
    let raw: RawEnvelope =
        serde_json::from_value(value).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;

    if !M::TAGS.contains(&raw.kind.as_str()) {
        return Err(EnvelopeError::UnknownType(raw.kind));
    }

    let normalized = serde_json::json!({ "type": raw.kind, "payload": raw.payload });
    serde_json::from_value(normalized).map_err(|e| EnvelopeError::TypeMismatch {
        tag: raw.kind,
        reason: e.to_string(),
    })
}

/// Error half of a [`Reply`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyError {
    pub reason: String,
    pub message: String,
}

/// Response envelope for request/response calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reply<T> {
    Data(T),
    Error(ReplyError),
}

impl<T> Reply<T> {
    pub fn ok(data: T) -> Self {
        Reply::Data(data)
    }

    pub fn err(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Reply::Error(ReplyError {
            reason: reason.into(),
            message: message.into(),
        })
    }

    pub fn into_result(self) -> Result<T, ReplyError> {
        match self {
            Reply::Data(data) => Ok(data),
            Reply::Error(err) => Err(err),
        }
    }
}

/// Decode reply bytes. An empty body is malformed.
pub fn decode_reply<T: DeserializeOwned>(bytes: &[u8]) -> Result<Reply<T>, EnvelopeError> {
    if bytes.is_empty() {
        return Err(EnvelopeError::Malformed("empty reply".to_string()));
    }
    serde_json::from_slice(bytes).map_err(|e| EnvelopeError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct GetLog {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "numReturn")]
        num_return: u32,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type", content = "payload")]
    enum CollectingRequest {
        #[serde(rename = "GET_TRANSLATE_LOG")]
        GetTranslateLog(GetLog),
        #[serde(rename = "GET_EXPLAIN_LOG")]
        GetExplainLog(GetLog),
    }

    impl Message for CollectingRequest {
        const TAGS: &'static [&'static str] = &["GET_TRANSLATE_LOG", "GET_EXPLAIN_LOG"];

        fn tag(&self) -> &'static str {
            match self {
                Self::GetTranslateLog(_) => "GET_TRANSLATE_LOG",
                Self::GetExplainLog(_) => "GET_EXPLAIN_LOG",
            }
        }
    }

    fn translate(user: &str) -> CollectingRequest {
        CollectingRequest::GetTranslateLog(GetLog {
            user_id: user.to_string(),
            num_return: 3,
        })
    }

    #[test]
    fn test_encode_writes_type_and_payload() {
        let bytes = encode(&translate("u1")).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["type"], "GET_TRANSLATE_LOG");
        assert_eq!(value["payload"]["userId"], "u1");
    }

    #[test]
    fn test_decode_known_tag() {
        let bytes = br#"{"type":"GET_EXPLAIN_LOG","payload":{"userId":"u2","numReturn":1}}"#;
        let decoded: CollectingRequest = decode(bytes).unwrap();
        assert_eq!(decoded.tag(), "GET_EXPLAIN_LOG");
    }

    #[test]
    fn test_decode_accepts_data_alias() {
        let bytes = br#"{"type":"GET_TRANSLATE_LOG","data":{"userId":"u1","numReturn":3}}"#;
        let decoded: CollectingRequest = decode(bytes).unwrap();
        assert_eq!(decoded, translate("u1"));
    }

    #[test]
    fn test_decode_unknown_tag() {
        let bytes = br#"{"type":"DROP_TABLES","payload":{}}"#;
        let err = decode::<CollectingRequest>(bytes).unwrap_err();
        assert_eq!(err, EnvelopeError::UnknownType("DROP_TABLES".to_string()));
    }

    #[test]
    fn test_decode_payload_shape_mismatch() {
        let bytes = br#"{"type":"GET_TRANSLATE_LOG","payload":{"user":"u1"}}"#;
        let err = decode::<CollectingRequest>(bytes).unwrap_err();
        assert!(
            matches!(err, EnvelopeError::TypeMismatch { ref tag, .. } if tag == "GET_TRANSLATE_LOG")
        );
    }

    #[test]
    fn test_decode_missing_payload_is_mismatch_not_zeroed() {
        let bytes = br#"{"type":"GET_TRANSLATE_LOG"}"#;
        let err = decode::<CollectingRequest>(bytes).unwrap_err();
        assert!(matches!(err, EnvelopeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode::<CollectingRequest>(b"not json"),
            Err(EnvelopeError::Malformed(_))
        ));
        assert!(matches!(
            decode::<CollectingRequest>(br#"{"payload":{}}"#),
            Err(EnvelopeError::Malformed(_))
        ));
    }

    #[test]
    fn test_reply_shapes() {
        let ok = serde_json::to_value(Reply::ok(vec![1, 2])).unwrap();
        assert_eq!(ok, serde_json::json!({ "data": [1, 2] }));

        let err = serde_json::to_value(Reply::<()>::err("not_found", "no profile")).unwrap();
        assert_eq!(err["error"]["reason"], "not_found");
    }

    #[test]
    fn test_decode_reply() {
        let reply: Reply<Vec<u32>> = decode_reply(br#"{"data":[7]}"#).unwrap();
        assert_eq!(reply.into_result().unwrap(), vec![7]);

        let reply: Reply<Vec<u32>> =
            decode_reply(br#"{"error":{"reason":"duplicate","message":"exists"}}"#).unwrap();
        assert_eq!(reply.into_result().unwrap_err().reason, "duplicate");

        assert!(decode_reply::<Vec<u32>>(b"").is_err());
    }
}
