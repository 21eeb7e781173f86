//! In-process stores for tests and local composition.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ExploreError, ExploreResult};
use crate::filter::Filter;
use crate::models::{EmbeddingVector, MatchInfo, NewMatchInfo, UserRef};
use crate::repository::{EmbeddingRepository, MatchRepository, UserDirectory};

#[derive(Default)]
pub struct InMemoryMatchRepository {
    by_user: RwLock<HashMap<Uuid, MatchInfo>>,
}

impl InMemoryMatchRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.by_user.read().await.len()
    }
}

#[async_trait]
impl MatchRepository for InMemoryMatchRepository {
    async fn insert_new_match_info(&self, input: NewMatchInfo) -> ExploreResult<MatchInfo> {
        let mut by_user = self.by_user.write().await;

        if by_user.contains_key(&input.user_id) {
            return Err(ExploreError::Duplicate(format!(
                "match profile for user {}",
                input.user_id
            )));
        }

        let info = MatchInfo::new(input);
        by_user.insert(info.user_id, info.clone());
        Ok(info)
    }

    async fn get_match_info_by_user_id(&self, user_id: Uuid) -> ExploreResult<MatchInfo> {
        self.by_user
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or_else(|| ExploreError::profile_not_found(user_id))
    }

    async fn get_candidate_user_ids(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> ExploreResult<Vec<Uuid>> {
        let by_user = self.by_user.read().await;
        let me = by_user
            .get(&user_id)
            .ok_or_else(|| ExploreError::profile_not_found(user_id))?;

        let mut ids: Vec<Uuid> = by_user
            .values()
            .filter(|other| me.is_candidate(other))
            .map(|other| other.user_id)
            .collect();
        ids.sort();
        ids.truncate(limit);
        Ok(ids)
    }

    async fn ensure_indexes(&self) -> ExploreResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<Uuid, UserRef>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: UserRef) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user(&self, id: Uuid) -> ExploreResult<Option<UserRef>> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

/// Brute-force cosine index
#[derive(Default)]
pub struct InMemoryEmbeddingRepository {
    vectors: RwLock<HashMap<Uuid, EmbeddingVector>>,
}

impl InMemoryEmbeddingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.vectors.read().await.len()
    }
}

#[async_trait]
impl EmbeddingRepository for InMemoryEmbeddingRepository {
    async fn set_embedding(&self, user_id: Uuid, vector: EmbeddingVector) -> ExploreResult<()> {
        self.vectors.write().await.insert(user_id, vector);
        Ok(())
    }

    async fn get_embedding(&self, user_id: Uuid) -> ExploreResult<Option<EmbeddingVector>> {
        Ok(self.vectors.read().await.get(&user_id).cloned())
    }

    async fn knn(
        &self,
        query: &EmbeddingVector,
        k: usize,
        filter: &Filter,
    ) -> ExploreResult<Vec<Uuid>> {
        let vectors = self.vectors.read().await;

        let mut scored: Vec<(f32, Uuid)> = vectors
            .iter()
            .filter(|(id, _)| filter.matches(id))
            .map(|(id, v)| (query.cosine_distance(v), *id))
            .collect();

        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });

        Ok(scored.into_iter().take(k).map(|(_, id)| id).collect())
    }

    async fn ensure_index(&self) -> ExploreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_info(user_id: Uuid, native: &str, learnings: &[&str]) -> NewMatchInfo {
        NewMatchInfo {
            user_id,
            name: format!("user-{}", user_id),
            native: native.to_string(),
            learnings: learnings.iter().map(|s| s.to_string()).collect(),
            interests: Vec::new(),
            age: None,
            gender: None,
            country: None,
            major: None,
        }
    }

    #[tokio::test]
    async fn test_insert_is_unique_per_user() {
        let repo = InMemoryMatchRepository::new();
        let user = Uuid::new_v4();

        repo.insert_new_match_info(new_info(user, "en", &["vi"]))
            .await
            .unwrap();
        let err = repo
            .insert_new_match_info(new_info(user, "en", &["vi"]))
            .await
            .unwrap_err();

        assert!(matches!(err, ExploreError::Duplicate(_)));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_candidates_by_language() {
        let repo = InMemoryMatchRepository::new();
        let me = Uuid::new_v4();
        let native_vi = Uuid::new_v4();
        let learning_vi = Uuid::new_v4();
        let other = Uuid::new_v4();

        for (id, native, learnings) in [
            (me, "en", vec!["vi"]),
            (native_vi, "vi", vec![]),
            (learning_vi, "ja", vec!["vi"]),
            (other, "de", vec!["fr"]),
        ] {
            repo.insert_new_match_info(new_info(id, native, &learnings))
                .await
                .unwrap();
        }

        let mut candidates = repo.get_candidate_user_ids(me, 1000).await.unwrap();
        candidates.sort();
        let mut expected = vec![native_vi, learning_vi];
        expected.sort();
        assert_eq!(candidates, expected);

        assert_eq!(repo.get_candidate_user_ids(me, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_learnings_means_no_candidates() {
        let repo = InMemoryMatchRepository::new();
        let me = Uuid::new_v4();
        repo.insert_new_match_info(new_info(me, "en", &[]))
            .await
            .unwrap();
        repo.insert_new_match_info(new_info(Uuid::new_v4(), "en", &["en"]))
            .await
            .unwrap();

        assert!(repo.get_candidate_user_ids(me, 1000).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_knn_orders_by_distance_and_filters() {
        let repo = InMemoryEmbeddingRepository::new();
        let (a, b, c) = (Uuid::from_u128(1), Uuid::from_u128(2), Uuid::from_u128(3));

        repo.set_embedding(a, vec![1.0, 0.0].into()).await.unwrap();
        repo.set_embedding(b, vec![0.9, 0.1].into()).await.unwrap();
        repo.set_embedding(c, vec![0.0, 1.0].into()).await.unwrap();

        let query: EmbeddingVector = vec![1.0, 0.0].into();
        let hits = repo.knn(&query, 5, &Filter::All).await.unwrap();
        assert_eq!(hits, vec![a, b, c]);

        let hits = repo
            .knn(&query, 5, &Filter::negate(Filter::ids([a])))
            .await
            .unwrap();
        assert_eq!(hits, vec![b, c]);

        let hits = repo.knn(&query, 1, &Filter::All).await.unwrap();
        assert_eq!(hits, vec![a]);
    }

    #[tokio::test]
    async fn test_set_embedding_overwrites() {
        let repo = InMemoryEmbeddingRepository::new();
        let user = Uuid::new_v4();

        repo.set_embedding(user, vec![1.0].into()).await.unwrap();
        repo.set_embedding(user, vec![2.0].into()).await.unwrap();

        assert_eq!(repo.len().await, 1);
        assert_eq!(
            repo.get_embedding(user).await.unwrap(),
            Some(vec![2.0].into())
        );
    }
}
