//! End-to-end behaviour of the explore service over the in-memory stores.

use std::sync::Arc;
use std::time::Duration;

use domain_explore::{
    EmbeddingRepository, EmbeddingVector, ExploreError, ExploreService,
    InMemoryEmbeddingRepository, InMemoryMatchRepository, InMemoryUserDirectory, NewMatchInfo,
    ServiceSettings, UserRef,
};
use test_utils::TestDataBuilder;
use test_utils::assertions::assert_excludes;
use transport::CallContext;
use uuid::Uuid;

const DIM: usize = 4;

struct Harness {
    service: ExploreService,
    users: Arc<InMemoryUserDirectory>,
    matches: Arc<InMemoryMatchRepository>,
    embeddings: Arc<InMemoryEmbeddingRepository>,
}

fn harness() -> Harness {
    let users = Arc::new(InMemoryUserDirectory::new());
    let matches = Arc::new(InMemoryMatchRepository::new());
    let embeddings = Arc::new(InMemoryEmbeddingRepository::new());

    let service = ExploreService::new(
        matches.clone(),
        embeddings.clone(),
        users.clone(),
        ServiceSettings {
            store_timeout: Duration::from_secs(1),
            candidate_limit: 100,
            embedding_dim: DIM,
        },
    );

    Harness {
        service,
        users,
        matches,
        embeddings,
    }
}

fn profile(user_id: Uuid, native: &str, learning: &str) -> NewMatchInfo {
    NewMatchInfo {
        user_id,
        name: format!("user-{}", &user_id.to_string()[..8]),
        native: native.to_string(),
        learnings: vec![learning.to_string()],
        interests: vec!["music".to_string()],
        age: Some(24),
        gender: None,
        country: None,
        major: None,
    }
}

fn vector(values: [f32; DIM]) -> EmbeddingVector {
    EmbeddingVector::new(values.to_vec())
}

impl Harness {
    /// Register a user, create a profile and store an embedding
    async fn onboard(&self, user: UserRef, native: &str, learning: &str, embed: [f32; DIM]) {
        let ctx = CallContext::background();
        let id = user.id;
        self.users.insert(user).await;
        self.service
            .add_user_match_information(&ctx, profile(id, native, learning))
            .await
            .unwrap();
        self.service
            .add_embedding(&ctx, id, vector(embed))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_onboarding_scenario() {
    let h = harness();
    let ctx = CallContext::background();
    let u1 = TestDataBuilder::from_test_name("test_onboarding_scenario").user_id(1);

    // Nothing stored yet
    let err = h.service.suggest(&ctx, u1).await.unwrap_err();
    assert!(matches!(err, ExploreError::NotFound(_)));

    h.users.insert(UserRef::new(u1)).await;
    let info = h
        .service
        .add_user_match_information(&ctx, profile(u1, "en", "vi"))
        .await
        .unwrap();
    assert_eq!(info.user_id, u1);
    assert!(!info.id.is_nil());

    let err = h
        .service
        .add_user_match_information(&ctx, profile(u1, "en", "vi"))
        .await
        .unwrap_err();
    assert!(matches!(err, ExploreError::Duplicate(_)));

    let embed = vector([0.1, 0.2, 0.3, 0.4]);
    h.service.add_embedding(&ctx, u1, embed.clone()).await.unwrap();
    h.service.add_embedding(&ctx, u1, embed.clone()).await.unwrap();
    assert_eq!(h.embeddings.len().await, 1);
    assert_eq!(h.embeddings.get_embedding(u1).await.unwrap(), Some(embed));

    let suggestions = h.service.suggest(&ctx, u1).await.unwrap();
    assert!(suggestions.is_empty());
}

#[tokio::test]
async fn test_profile_without_embedding_is_incomplete() {
    let h = harness();
    let ctx = CallContext::background();
    let user = Uuid::new_v4();

    h.users.insert(UserRef::new(user)).await;
    h.service
        .add_user_match_information(&ctx, profile(user, "ko", "en"))
        .await
        .unwrap();

    let err = h.service.suggest(&ctx, user).await.unwrap_err();
    assert!(matches!(err, ExploreError::ProfileIncomplete(_)));
    assert_eq!(err.reason(), "profile_incomplete");
}

#[tokio::test]
async fn test_suggestions_rank_by_similarity_and_skip_self_and_friends() {
    let h = harness();
    let ctx = CallContext::background();
    let data = TestDataBuilder::from_test_name("rank_and_exclude");
    let me = data.user_id(0);
    let friend = data.user_id(1);
    let close = data.user_id(2);
    let far = data.user_id(3);

    h.onboard(
        UserRef::new(me).with_friends([friend]),
        "en",
        "vi",
        [1.0, 0.0, 0.0, 0.0],
    )
    .await;
    // Friend is the most similar vector of all and must still be skipped
    h.onboard(UserRef::new(friend), "vi", "en", [1.0, 0.0, 0.0, 0.0])
        .await;
    h.onboard(UserRef::new(close), "vi", "en", [0.9, 0.1, 0.0, 0.0])
        .await;
    h.onboard(UserRef::new(far), "vi", "en", [0.0, 1.0, 0.0, 0.0])
        .await;

    let suggestions = h.service.suggest(&ctx, me).await.unwrap();
    let ids: Vec<Uuid> = suggestions.iter().map(|s| s.user_id).collect();

    assert_eq!(ids, vec![close, far]);
    assert_excludes(&ids, &[me, friend], "suggest");
}

#[tokio::test]
async fn test_suggestions_limited_to_language_candidates() {
    let h = harness();
    let ctx = CallContext::background();
    let data = TestDataBuilder::from_test_name("language_candidates");
    let me = data.user_id(0);
    let speaks_vi = data.user_id(1);
    let speaks_ja = data.user_id(2);

    h.onboard(UserRef::new(me), "en", "vi", [1.0, 0.0, 0.0, 0.0])
        .await;
    h.onboard(UserRef::new(speaks_vi), "vi", "en", [0.0, 1.0, 0.0, 0.0])
        .await;
    // Closer in embedding space but shares no language with `me`
    h.onboard(UserRef::new(speaks_ja), "ja", "fr", [1.0, 0.0, 0.0, 0.0])
        .await;

    let ids: Vec<Uuid> = h
        .service
        .suggest(&ctx, me)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.user_id)
        .collect();
    assert_eq!(ids, vec![speaks_vi]);
}

#[tokio::test]
async fn test_suggestions_capped() {
    let h = harness();
    let ctx = CallContext::background();
    let data = TestDataBuilder::from_test_name("capped");
    let me = data.user_id(0);

    h.onboard(UserRef::new(me), "en", "vi", [1.0, 0.0, 0.0, 0.0])
        .await;
    for n in 1..=8 {
        h.onboard(
            UserRef::new(data.user_id(n)),
            "vi",
            "en",
            [1.0, n as f32 * 0.1, 0.0, 0.0],
        )
        .await;
    }

    let suggestions = h.service.suggest(&ctx, me).await.unwrap();
    assert_eq!(suggestions.len(), domain_explore::SUGGESTION_COUNT);
}

#[tokio::test]
async fn test_embedding_requires_profile() {
    let h = harness();
    let ctx = CallContext::background();

    let err = h
        .service
        .add_embedding(&ctx, Uuid::new_v4(), vector([0.0; DIM]))
        .await
        .unwrap_err();
    assert!(matches!(err, ExploreError::NotFound(_)));
    assert_eq!(h.embeddings.len().await, 0);
}

#[tokio::test]
async fn test_concurrent_inserts_yield_one_duplicate() {
    let h = harness();
    let user = Uuid::new_v4();
    h.users.insert(UserRef::new(user)).await;

    let a = h.service.clone();
    let b = h.service.clone();
    let (first, second) = tokio::join!(
        async move {
            a.add_user_match_information(&CallContext::background(), profile(user, "en", "vi"))
                .await
        },
        async move {
            b.add_user_match_information(&CallContext::background(), profile(user, "en", "vi"))
                .await
        },
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(ExploreError::Duplicate(_))))
    );
    assert_eq!(h.matches.len().await, 1);
}

#[tokio::test]
async fn test_unknown_user_cannot_create_profile() {
    let h = harness();
    let err = h
        .service
        .add_user_match_information(&CallContext::background(), profile(Uuid::new_v4(), "en", "vi"))
        .await
        .unwrap_err();

    assert!(matches!(err, ExploreError::NotFound(_)));
    assert_eq!(h.matches.len().await, 0);
}
