use core_config::{
    FromEnv, mongodb::MongoConfig, redis::RedisConfig, server::ServerConfig,
};
use domain_explore::{ExploreConfig, VectorBackend};

pub use core_config::Environment;

/// Process configuration, composed from the shared config pieces
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: Environment,
    pub server: ServerConfig,
    pub mongodb: MongoConfig,
    /// Only loaded when embeddings live in Redis Stack
    pub redis: Option<RedisConfig>,
    pub explore: ExploreConfig,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?;
        let mongodb = MongoConfig::from_env()?;
        let explore = ExploreConfig::from_env()?;

        let redis = match explore.vector_backend {
            VectorBackend::Redis => Some(RedisConfig::from_env()?),
            VectorBackend::Qdrant | VectorBackend::Memory => None,
        };

        Ok(Self {
            environment,
            server,
            mongodb,
            redis,
            explore,
        })
    }
}
