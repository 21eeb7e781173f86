use crate::{env_or_default, env_required, ConfigError, FromEnv};

/// MongoDB connection settings for the match profile store
#[derive(Clone, Debug)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

impl MongoConfig {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
        }
    }
}

impl FromEnv for MongoConfig {
    /// Requires MONGO_URI; MONGO_DATABASE defaults to "explore"
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            uri: env_required("MONGO_URI")?,
            database: env_or_default("MONGO_DATABASE", "explore"),
        })
    }
}
