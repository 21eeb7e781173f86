//! Store connections and the wired-up service.

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, routing::get};
use domain_explore::{
    EmbeddingRepository, ExploreService, InMemoryEmbeddingRepository, MatchRepository,
    MongoMatchRepository, MongoUserDirectory, QdrantEmbeddingRepository,
    RedisEmbeddingRepository, ServiceSettings, VectorBackend, handlers,
};
use eyre::{WrapErr, eyre};
use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use redis::aio::ConnectionManager;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::openapi;

pub struct AppState {
    pub service: ExploreService,
}

impl AppState {
    pub async fn connect(config: &Config) -> eyre::Result<Self> {
        let db = connect_mongo(config).await?;

        let matches = MongoMatchRepository::with_collection(&db, &config.explore.matches_collection);
        matches
            .ensure_indexes()
            .await
            .wrap_err("failed to create match indexes")?;

        let users = MongoUserDirectory::with_collection(&db, &config.explore.users_collection);
        let embeddings = connect_embeddings(config).await?;

        let service = ExploreService::new(
            Arc::new(matches),
            embeddings,
            Arc::new(users),
            ServiceSettings::from(&config.explore),
        );

        Ok(Self { service })
    }

    pub fn router(self) -> Router {
        handlers::router(self.service)
            .route("/openapi.json", get(|| async { Json(openapi::document()) }))
            .layer(TraceLayer::new_for_http())
    }
}

async fn connect_mongo(config: &Config) -> eyre::Result<Database> {
    info!("Connecting to MongoDB");

    let mut options = ClientOptions::parse(&config.mongodb.uri)
        .await
        .wrap_err("invalid MONGO_URI")?;
    options.app_name = Some("explore".to_string());
    options.connect_timeout = Some(Duration::from_secs(10));
    options.server_selection_timeout = Some(Duration::from_secs(30));

    let client = Client::with_options(options)?;
    let db = client.database(&config.mongodb.database);
    db.run_command(doc! { "ping": 1 })
        .await
        .wrap_err("MongoDB ping failed")?;

    info!(database = %config.mongodb.database, "Connected to MongoDB");
    Ok(db)
}

async fn connect_embeddings(config: &Config) -> eyre::Result<Arc<dyn EmbeddingRepository>> {
    let explore = &config.explore;

    let repo: Arc<dyn EmbeddingRepository> = match explore.vector_backend {
        VectorBackend::Redis => {
            let redis_config = config
                .redis
                .as_ref()
                .ok_or_else(|| eyre!("REDIS_HOST is required for the redis vector backend"))?;

            info!("Connecting to Redis Stack");
            let client = redis::Client::open(redis_config.uri.as_str()).wrap_err("invalid REDIS_HOST")?;
            let manager = ConnectionManager::new(client)
                .await
                .wrap_err("failed to connect to Redis")?;
            let mut conn = manager.clone();
            let _: String = redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .wrap_err("Redis ping failed")?;

            Arc::new(RedisEmbeddingRepository::new(manager, explore.embedding_dim))
        }
        VectorBackend::Qdrant => {
            info!(url = %explore.qdrant_url, "Connecting to Qdrant");
            Arc::new(QdrantEmbeddingRepository::connect(
                &explore.qdrant_url,
                explore.qdrant_api_key.clone(),
                explore.store_timeout,
                explore.embedding_dim,
            )?)
        }
        VectorBackend::Memory => {
            warn!("Using in-memory embeddings; nothing survives a restart");
            Arc::new(InMemoryEmbeddingRepository::new())
        }
    };

    repo.ensure_index()
        .await
        .wrap_err("failed to prepare vector index")?;
    Ok(repo)
}
