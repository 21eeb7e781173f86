//! MongoDB implementations of [`MatchRepository`] and [`UserDirectory`]

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{Binary, Bson, doc, spec::BinarySubtype},
    error::{ErrorKind, WriteFailure},
    options::{FindOptions, IndexOptions},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{ExploreError, ExploreResult};
use crate::models::{MatchInfo, NewMatchInfo, UserRef};
use crate::repository::{MatchRepository, UserDirectory};

const DUPLICATE_KEY: i32 = 11000;

/// Documents are written with the raw (non human-readable) serializer, which
/// stores a `Uuid` as generic binary. Queries must use the same encoding.
fn uuid_bson(id: &Uuid) -> Bson {
    Bson::Binary(Binary {
        subtype: BinarySubtype::Generic,
        bytes: id.as_bytes().to_vec(),
    })
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

#[derive(Deserialize)]
struct CandidateRow {
    user_id: Uuid,
}

/// Stored layout of a match profile: `_id` key, snake_case fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MatchDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    user_id: Uuid,
    name: String,
    native: String,
    #[serde(default)]
    learnings: Vec<String>,
    #[serde(default)]
    interests: Vec<String>,
    age: Option<i32>,
    gender: Option<String>,
    country: Option<String>,
    major: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MatchInfo> for MatchDocument {
    fn from(info: MatchInfo) -> Self {
        Self {
            id: info.id,
            user_id: info.user_id,
            name: info.name,
            native: info.native,
            learnings: info.learnings,
            interests: info.interests,
            age: info.age,
            gender: info.gender,
            country: info.country,
            major: info.major,
            created_at: info.created_at,
            updated_at: info.updated_at,
        }
    }
}

impl From<MatchDocument> for MatchInfo {
    fn from(doc: MatchDocument) -> Self {
        Self {
            id: doc.id,
            user_id: doc.user_id,
            name: doc.name,
            native: doc.native,
            learnings: doc.learnings,
            interests: doc.interests,
            age: doc.age,
            gender: doc.gender,
            country: doc.country,
            major: doc.major,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

pub struct MongoMatchRepository {
    collection: Collection<MatchDocument>,
}

impl MongoMatchRepository {
    /// Profiles live in the `matches` collection
    pub fn new(db: &Database) -> Self {
        Self::with_collection(db, "matches")
    }

    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<MatchDocument>(collection_name),
        }
    }
}

#[async_trait]
impl MatchRepository for MongoMatchRepository {
    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    async fn insert_new_match_info(&self, input: NewMatchInfo) -> ExploreResult<MatchInfo> {
        let info = MatchInfo::new(input);

        match self.collection.insert_one(MatchDocument::from(info.clone())).await {
            Ok(_) => {
                tracing::info!(match_id = %info.id, "match profile created");
                Ok(info)
            }
            Err(e) if is_duplicate_key(&e) => Err(ExploreError::Duplicate(format!(
                "match profile for user {}",
                info.user_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn get_match_info_by_user_id(&self, user_id: Uuid) -> ExploreResult<MatchInfo> {
        self.collection
            .find_one(doc! { "user_id": uuid_bson(&user_id) })
            .await?
            .map(MatchInfo::from)
            .ok_or_else(|| ExploreError::profile_not_found(user_id))
    }

    #[instrument(skip(self))]
    async fn get_candidate_user_ids(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> ExploreResult<Vec<Uuid>> {
        let me = self.get_match_info_by_user_id(user_id).await?;
        if me.learnings.is_empty() {
            return Ok(Vec::new());
        }

        let filter = doc! {
            "user_id": { "$ne": uuid_bson(&user_id) },
            "$or": [
                { "native": { "$in": me.learnings.clone() } },
                { "learnings": { "$in": me.learnings.clone() } },
            ],
        };
        let options = FindOptions::builder()
            .projection(doc! { "user_id": 1, "_id": 0 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .build();

        let rows: Vec<CandidateRow> = self
            .collection
            .clone_with_type::<CandidateRow>()
            .find(filter)
            .with_options(options)
            .await?
            .try_collect()
            .await?;

        Ok(rows.into_iter().map(|r| r.user_id).collect())
    }

    async fn ensure_indexes(&self) -> ExploreResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "user_id": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("idx_user_id_unique".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "native": 1 })
                .options(IndexOptions::builder().name("idx_native".to_string()).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "learnings": 1 })
                .options(
                    IndexOptions::builder()
                        .name("idx_learnings".to_string())
                        .build(),
                )
                .build(),
        ];

        self.collection.create_indexes(indexes).await?;
        tracing::info!("match indexes created");
        Ok(())
    }
}

/// Directory backed by the shared `users` collection
pub struct MongoUserDirectory {
    collection: Collection<UserRef>,
}

impl MongoUserDirectory {
    pub fn new(db: &Database) -> Self {
        Self::with_collection(db, "users")
    }

    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<UserRef>(collection_name),
        }
    }
}

#[async_trait]
impl UserDirectory for MongoUserDirectory {
    #[instrument(skip(self))]
    async fn get_user(&self, id: Uuid) -> ExploreResult<Option<UserRef>> {
        let user = self
            .collection
            .find_one(doc! { "_id": uuid_bson(&id) })
            .await?;
        Ok(user)
    }
}
