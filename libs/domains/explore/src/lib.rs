//! Explore Domain
//!
//! Match profiles, embeddings and similarity-based suggestions of language
//! partners.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐      ┌──────────────┐
//! │  Handlers   │ ◀─── │ ExploreClient│  ← other services, over transport
//! └──────┬──────┘      └──────────────┘
//!        │ dispatch (ExploreRequest / ExploreEvent)
//! ┌──────▼──────┐
//! │   Service   │  ← suggest / add_user_match_information / add_embedding
//! └──────┬──────┘
//!        │
//! ┌──────▼───────────────────────────────────────────┐
//! │ MatchRepository │ UserDirectory │ EmbeddingRepository │
//! │    (MongoDB)    │   (MongoDB)   │ (Redis Stack/Qdrant) │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use domain_explore::{
//!     ExploreService, InMemoryEmbeddingRepository, InMemoryMatchRepository,
//!     InMemoryUserDirectory, ServiceSettings, handlers,
//! };
//!
//! let service = ExploreService::new(
//!     Arc::new(InMemoryMatchRepository::new()),
//!     Arc::new(InMemoryEmbeddingRepository::new()),
//!     Arc::new(InMemoryUserDirectory::new()),
//!     ServiceSettings::default(),
//! );
//! let router = handlers::router(service);
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod mongodb;
pub mod protocol;
pub mod qdrant;
pub mod redis;
pub mod repository;
pub mod service;

pub use client::ExploreClient;
pub use config::{ExploreConfig, VectorBackend};
pub use error::{ExploreError, ExploreResult};
pub use filter::Filter;
pub use handlers::ApiDoc;
pub use memory::{InMemoryEmbeddingRepository, InMemoryMatchRepository, InMemoryUserDirectory};
pub use models::{EmbeddingVector, MatchInfo, NewMatchInfo, UserRef};
pub use crate::mongodb::{MongoMatchRepository, MongoUserDirectory};
pub use protocol::{EmbeddingPayload, ExploreEvent, ExploreRequest, SuggestPayload};
pub use crate::qdrant::QdrantEmbeddingRepository;
pub use crate::redis::RedisEmbeddingRepository;
pub use repository::{EmbeddingRepository, MatchRepository, UserDirectory};
pub use service::{ExploreService, SUGGESTION_COUNT, ServiceSettings};
