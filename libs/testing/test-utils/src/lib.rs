//! Shared test utilities for domain testing
//!
//! - `TestMongo`: MongoDB container with automatic cleanup (feature: "mongo")
//! - `TestRedisStack`: Redis Stack container (RedisJSON + RediSearch) with
//!   automatic cleanup (feature: "redis")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! Container-backed tests need a Docker daemon; mark them `#[ignore]` and run
//! them with `cargo test -- --ignored`.
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["mongo", "redis"] }
//! ```
//!
//! ```rust,ignore
//! use test_utils::{TestMongo, TestDataBuilder};
//!
//! #[tokio::test]
//! #[ignore]
//! async fn my_mongo_test() {
//!     let mongo = TestMongo::new().await;
//!     let db = mongo.database("explore_test");
//!     let builder = TestDataBuilder::from_test_name("my_mongo_test");
//!     let user_id = builder.user_id(0);
//! }
//! ```

use uuid::Uuid;

#[cfg(feature = "mongo")]
mod mongo;

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "mongo")]
pub use mongo::TestMongo;

#[cfg(feature = "redis")]
pub use redis::TestRedisStack;

/// Builder for test data with deterministic randomization
///
/// Seeded so that a failing test reproduces with identical ids and vectors.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_suggest");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// The `n`-th user id of this test. Distinct for distinct `n`.
    pub fn user_id(&self, n: u32) -> Uuid {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.seed.to_le_bytes());
        bytes[12..16].copy_from_slice(&n.to_be_bytes());
        Uuid::from_bytes(bytes)
    }

    /// Unique name, e.g. `test-collection-12345-matches`
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// Deterministic unit-ish vector of `dim` values in `[-1, 1]`.
    ///
    /// Vectors for nearby `n` are not meant to be similar; build explicit
    /// vectors when a test depends on similarity order.
    pub fn embedding(&self, dim: usize, n: u32) -> Vec<f32> {
        let mut state = self.seed ^ ((n as u64) << 32 | n as u64) | 1;
        (0..dim)
            .map(|_| {
                // xorshift64
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                ((state % 2001) as f32 / 1000.0) - 1.0
            })
            .collect()
    }
}

/// Test assertion helpers
pub mod assertions {
    use uuid::Uuid;

    /// Assert that no id in `forbidden` appears in `actual`
    pub fn assert_excludes(actual: &[Uuid], forbidden: &[Uuid], context: &str) {
        for id in forbidden {
            assert!(
                !actual.contains(id),
                "{}: {} must not appear in {:?}",
                context,
                id,
                actual
            );
        }
    }

    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let a = TestDataBuilder::new(42);
        let b = TestDataBuilder::new(42);

        assert_eq!(a.user_id(3), b.user_id(3));
        assert_eq!(a.embedding(8, 1), b.embedding(8, 1));
        assert_eq!(a.name("collection", "x"), b.name("collection", "x"));
    }

    #[test]
    fn test_user_ids_are_distinct() {
        let builder = TestDataBuilder::from_test_name("distinct");
        let ids: std::collections::HashSet<Uuid> = (0..100).map(|n| builder.user_id(n)).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_embedding_range() {
        let v = TestDataBuilder::new(7).embedding(64, 2);
        assert_eq!(v.len(), 64);
        assert!(v.iter().all(|x| (-1.0..=1.0).contains(x)));
    }

    #[test]
    fn test_different_names_give_different_users() {
        let a = TestDataBuilder::from_test_name("test1");
        let b = TestDataBuilder::from_test_name("test2");
        assert_ne!(a.user_id(0), b.user_id(0));
    }
}
