//! Explore service: match profiles, embeddings and suggestions

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};
use transport::CallContext;
use uuid::Uuid;
use validator::Validate;

use crate::config::ExploreConfig;
use crate::error::{ExploreError, ExploreResult};
use crate::filter::Filter;
use crate::models::{EmbeddingVector, MatchInfo, NewMatchInfo};
use crate::repository::{EmbeddingRepository, MatchRepository, UserDirectory};

/// How many users a suggestion returns at most
pub const SUGGESTION_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    pub store_timeout: Duration,
    pub candidate_limit: usize,
    pub embedding_dim: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from(&ExploreConfig::default())
    }
}

impl From<&ExploreConfig> for ServiceSettings {
    fn from(config: &ExploreConfig) -> Self {
        Self {
            store_timeout: config.store_timeout,
            candidate_limit: config.candidate_limit,
            embedding_dim: config.embedding_dim,
        }
    }
}

/// Stateless over its stores; cheap to clone and share across tasks.
#[derive(Clone)]
pub struct ExploreService {
    matches: Arc<dyn MatchRepository>,
    embeddings: Arc<dyn EmbeddingRepository>,
    users: Arc<dyn UserDirectory>,
    settings: ServiceSettings,
}

impl ExploreService {
    pub fn new(
        matches: Arc<dyn MatchRepository>,
        embeddings: Arc<dyn EmbeddingRepository>,
        users: Arc<dyn UserDirectory>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            matches,
            embeddings,
            users,
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Run one store operation bounded by the store timeout and the caller's
    /// context
    async fn bounded<T, F>(&self, ctx: &CallContext, op: F) -> ExploreResult<T>
    where
        F: Future<Output = ExploreResult<T>>,
    {
        ctx.child_with_timeout(self.settings.store_timeout)
            .run(op)
            .await?
    }

    /// Up to [`SUGGESTION_COUNT`] users close to `user_id` in embedding
    /// space, never including the user or their friends.
    #[instrument(skip(self, ctx))]
    pub async fn suggest(&self, ctx: &CallContext, user_id: Uuid) -> ExploreResult<Vec<MatchInfo>> {
        self.bounded(ctx, self.matches.get_match_info_by_user_id(user_id))
            .await?;

        let user = self
            .bounded(ctx, self.users.get_user(user_id))
            .await?
            .ok_or_else(|| ExploreError::user_not_found(user_id))?;

        let embedding = self
            .bounded(ctx, self.embeddings.get_embedding(user_id))
            .await?
            .ok_or_else(|| {
                ExploreError::ProfileIncomplete(format!(
                    "no embedding for user {}, onboarding may not have finished",
                    user_id
                ))
            })?;

        let mut excluded = Vec::with_capacity(user.friend_ids.len() + 1);
        excluded.push(user.id);
        excluded.extend(user.friend_ids.iter().copied());

        let candidates = self
            .bounded(
                ctx,
                self.matches
                    .get_candidate_user_ids(user_id, self.settings.candidate_limit),
            )
            .await?;

        let filter = Filter::exclude_then_include(excluded, candidates);
        let hits = self
            .bounded(ctx, self.embeddings.knn(&embedding, SUGGESTION_COUNT, &filter))
            .await?;

        let mut suggestions = Vec::with_capacity(hits.len());
        for id in hits {
            let info = self
                .bounded(ctx, self.matches.get_match_info_by_user_id(id))
                .await?;
            suggestions.push(info);
        }

        info!(count = suggestions.len(), "suggestions computed");
        Ok(suggestions)
    }

    /// Create the user's match profile. The user must exist in the directory.
    #[instrument(skip(self, ctx, input), fields(user_id = %input.user_id))]
    pub async fn add_user_match_information(
        &self,
        ctx: &CallContext,
        input: NewMatchInfo,
    ) -> ExploreResult<MatchInfo> {
        input.validate()?;

        let user_id = input.user_id;
        self.bounded(ctx, self.users.get_user(user_id))
            .await?
            .ok_or_else(|| ExploreError::user_not_found(user_id))?;

        self.bounded(ctx, self.matches.insert_new_match_info(input))
            .await
    }

    /// Store or replace the user's embedding. The user must have a profile.
    #[instrument(skip(self, ctx, vector), fields(dim = vector.dim()))]
    pub async fn add_embedding(
        &self,
        ctx: &CallContext,
        user_id: Uuid,
        vector: EmbeddingVector,
    ) -> ExploreResult<()> {
        if vector.dim() != self.settings.embedding_dim {
            return Err(ExploreError::Validation(format!(
                "embedding has {} dimensions, index expects {}",
                vector.dim(),
                self.settings.embedding_dim
            )));
        }
        if !vector.is_finite() {
            return Err(ExploreError::Validation(
                "embedding contains non-finite values".to_string(),
            ));
        }

        self.bounded(ctx, self.matches.get_match_info_by_user_id(user_id))
            .await?;
        self.bounded(ctx, self.embeddings.set_embedding(user_id, vector))
            .await
    }
}
