use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ExploreResult;
use crate::filter::Filter;
use crate::models::{EmbeddingVector, MatchInfo, NewMatchInfo, UserRef};

/// Store for structured match profiles, keyed by user
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchRepository: Send + Sync {
    /// Persist a new profile. `Duplicate` when the user already has one.
    async fn insert_new_match_info(&self, input: NewMatchInfo) -> ExploreResult<MatchInfo>;

    /// `NotFound` when the user has no profile
    async fn get_match_info_by_user_id(&self, user_id: Uuid) -> ExploreResult<MatchInfo>;

    /// Up to `limit` other users who natively speak, or are learning, a
    /// language `user_id` is learning
    async fn get_candidate_user_ids(&self, user_id: Uuid, limit: usize)
    -> ExploreResult<Vec<Uuid>>;

    /// Create the unique index on `user_id`
    async fn ensure_indexes(&self) -> ExploreResult<()>;
}

/// Read-only view of the user directory and its friend graph
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, id: Uuid) -> ExploreResult<Option<UserRef>>;
}

/// Vector index of per-user embeddings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingRepository: Send + Sync {
    /// Upsert; the last write wins
    async fn set_embedding(&self, user_id: Uuid, vector: EmbeddingVector) -> ExploreResult<()>;

    async fn get_embedding(&self, user_id: Uuid) -> ExploreResult<Option<EmbeddingVector>>;

    /// Ids of the `k` nearest vectors passing `filter`, nearest first
    async fn knn(
        &self,
        query: &EmbeddingVector,
        k: usize,
        filter: &Filter,
    ) -> ExploreResult<Vec<Uuid>>;

    /// Create the vector index if it does not exist yet
    async fn ensure_index(&self) -> ExploreResult<()>;
}
