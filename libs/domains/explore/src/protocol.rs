//! Envelopes understood by the explore invocation target.

use serde::{Deserialize, Serialize};
use transport::Message;
use uuid::Uuid;

use crate::models::{EmbeddingVector, NewMatchInfo};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestPayload {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingPayload {
    pub user_id: Uuid,
    pub embed: EmbeddingVector,
}

/// Call-and-wait requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ExploreRequest {
    #[serde(rename = "ADD_USER_MATCH_INFO")]
    AddUserMatchInfo(NewMatchInfo),
    #[serde(rename = "SUGGEST")]
    Suggest(SuggestPayload),
    #[serde(rename = "ADD_EMBEDDING")]
    AddEmbedding(EmbeddingPayload),
}

impl Message for ExploreRequest {
    const TAGS: &'static [&'static str] = &["ADD_USER_MATCH_INFO", "SUGGEST", "ADD_EMBEDDING"];

    fn tag(&self) -> &'static str {
        match self {
            Self::AddUserMatchInfo(_) => "ADD_USER_MATCH_INFO",
            Self::Suggest(_) => "SUGGEST",
            Self::AddEmbedding(_) => "ADD_EMBEDDING",
        }
    }
}

/// Fire-and-forget events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ExploreEvent {
    #[serde(rename = "ADD_EMBEDDING")]
    AddEmbedding(EmbeddingPayload),
    #[serde(rename = "ADD_USER_MATCH_INFO")]
    AddUserMatchInfo(NewMatchInfo),
}

impl Message for ExploreEvent {
    const TAGS: &'static [&'static str] = &["ADD_EMBEDDING", "ADD_USER_MATCH_INFO"];

    fn tag(&self) -> &'static str {
        match self {
            Self::AddEmbedding(_) => "ADD_EMBEDDING",
            Self::AddUserMatchInfo(_) => "ADD_USER_MATCH_INFO",
        }
    }
}
