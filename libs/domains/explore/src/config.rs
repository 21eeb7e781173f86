use std::time::Duration;

use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or};
use strum::{Display, EnumString};

/// Which vector index backs embeddings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum VectorBackend {
    Redis,
    Qdrant,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExploreConfig {
    pub vector_backend: VectorBackend,
    pub embedding_dim: usize,
    /// Bound on every single store operation
    pub store_timeout: Duration,
    /// Upper bound on language-matched candidates fed into the pre-filter
    pub candidate_limit: usize,
    pub matches_collection: String,
    pub users_collection: String,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            vector_backend: VectorBackend::Redis,
            embedding_dim: 1536,
            store_timeout: Duration::from_secs(5),
            candidate_limit: 1000,
            matches_collection: "matches".to_string(),
            users_collection: "users".to_string(),
            qdrant_url: "http://localhost:6334".to_string(),
            qdrant_api_key: None,
        }
    }
}

impl FromEnv for ExploreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let vector_backend: VectorBackend =
            env_parse_or("EXPLORE_VECTOR_BACKEND", defaults.vector_backend)?;
        let embedding_dim: usize = env_parse_or("EXPLORE_EMBEDDING_DIM", defaults.embedding_dim)?;
        let store_timeout_secs: u64 = env_parse_or("EXPLORE_STORE_TIMEOUT_SECS", 5)?;
        let candidate_limit: usize =
            env_parse_or("EXPLORE_CANDIDATE_LIMIT", defaults.candidate_limit)?;

        if embedding_dim == 0 {
            return Err(ConfigError::Invalid(
                "EXPLORE_EMBEDDING_DIM must be greater than zero".to_string(),
            ));
        }
        if store_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "EXPLORE_STORE_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            vector_backend,
            embedding_dim,
            store_timeout: Duration::from_secs(store_timeout_secs),
            candidate_limit,
            matches_collection: env_or_default(
                "EXPLORE_MATCHES_COLLECTION",
                &defaults.matches_collection,
            ),
            users_collection: env_or_default("EXPLORE_USERS_COLLECTION", &defaults.users_collection),
            qdrant_url: env_or_default("QDRANT_URL", &defaults.qdrant_url),
            qdrant_api_key: std::env::var("QDRANT_API_KEY").ok(),
        })
    }
}
