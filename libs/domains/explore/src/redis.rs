//! Redis Stack vector index.
//!
//! Each user's embedding is a RedisJSON document at `match:<uuid>`:
//!
//! ```text
//! { "embed": [f32; DIM], "id": "<uuid>" }
//! ```
//!
//! and `idx:match_vss` indexes `$.id` as a TAG and `$.embed` as a FLAT
//! cosine vector. Queries use `FT.SEARCH ... =>[KNN k @embed $query_vector]`
//! with DIALECT 2 and return only the `id` field.

use async_trait::async_trait;
use redis::Value;
use redis::aio::ConnectionManager;
use serde_json::json;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{ExploreError, ExploreResult};
use crate::filter::{Filter, ID_FIELD};
use crate::models::EmbeddingVector;
use crate::repository::EmbeddingRepository;

pub const DEFAULT_INDEX: &str = "idx:match_vss";
pub const KEY_PREFIX: &str = "match:";

pub fn match_key(user_id: Uuid) -> String {
    format!("{}{}", KEY_PREFIX, user_id)
}

pub struct RedisEmbeddingRepository {
    conn: ConnectionManager,
    index: String,
    dim: usize,
}

impl RedisEmbeddingRepository {
    pub fn new(conn: ConnectionManager, dim: usize) -> Self {
        Self::with_index(conn, DEFAULT_INDEX, dim)
    }

    pub fn with_index(conn: ConnectionManager, index: impl Into<String>, dim: usize) -> Self {
        Self {
            conn,
            index: index.into(),
            dim,
        }
    }

    /// Full KNN query string for `filter`
    pub fn knn_query(filter: &Filter, k: usize) -> String {
        format!(
            "{}=>[KNN {} @embed $query_vector AS vector_score]",
            filter.to_redis_query(),
            k
        )
    }
}

#[async_trait]
impl EmbeddingRepository for RedisEmbeddingRepository {
    #[instrument(skip(self, vector), fields(dim = vector.dim()))]
    async fn set_embedding(&self, user_id: Uuid, vector: EmbeddingVector) -> ExploreResult<()> {
        let document = json!({ "embed": vector, "id": user_id });
        let mut conn = self.conn.clone();

        redis::cmd("JSON.SET")
            .arg(match_key(user_id))
            .arg("$")
            .arg(serde_json::to_string(&document)?)
            .query_async::<()>(&mut conn)
            .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_embedding(&self, user_id: Uuid) -> ExploreResult<Option<EmbeddingVector>> {
        let mut conn = self.conn.clone();

        let raw: Option<String> = redis::cmd("JSON.GET")
            .arg(match_key(user_id))
            .arg("$.embed")
            .query_async(&mut conn)
            .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        // JSONPath results come back wrapped in an array
        let mut matches: Vec<EmbeddingVector> = serde_json::from_str(&raw)?;
        Ok(if matches.is_empty() {
            None
        } else {
            Some(matches.swap_remove(0))
        })
    }

    #[instrument(skip(self, query, filter), fields(k = k))]
    async fn knn(
        &self,
        query: &EmbeddingVector,
        k: usize,
        filter: &Filter,
    ) -> ExploreResult<Vec<Uuid>> {
        let search = Self::knn_query(filter, k);
        debug!(query = %search, "vector search");

        let mut conn = self.conn.clone();
        let reply: Value = redis::cmd("FT.SEARCH")
            .arg(&self.index)
            .arg(search)
            .arg("SORTBY")
            .arg("vector_score")
            .arg("PARAMS")
            .arg(2)
            .arg("query_vector")
            .arg(query.to_le_bytes())
            .arg("DIALECT")
            .arg(2)
            .arg("RETURN")
            .arg(1)
            .arg(ID_FIELD)
            .arg("LIMIT")
            .arg(0)
            .arg(k)
            .query_async(&mut conn)
            .await?;

        parse_search_ids(reply)
    }

    async fn ensure_index(&self) -> ExploreResult<()> {
        let mut conn = self.conn.clone();

        let created = redis::cmd("FT.CREATE")
            .arg(&self.index)
            .arg("ON")
            .arg("JSON")
            .arg("PREFIX")
            .arg(1)
            .arg(KEY_PREFIX)
            .arg("SCHEMA")
            .arg("$.id")
            .arg("AS")
            .arg(ID_FIELD)
            .arg("TAG")
            .arg("$.embed")
            .arg("AS")
            .arg("embed")
            .arg("VECTOR")
            .arg("FLAT")
            .arg(6)
            .arg("TYPE")
            .arg("FLOAT32")
            .arg("DIM")
            .arg(self.dim)
            .arg("DISTANCE_METRIC")
            .arg("COSINE")
            .query_async::<()>(&mut conn)
            .await;

        match created {
            Ok(()) => {
                info!(index = %self.index, dim = self.dim, "vector index created");
                Ok(())
            }
            Err(e) if e.to_string().contains("Index already exists") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Some(s.clone()),
        _ => None,
    }
}

/// Pull ids out of an `FT.SEARCH` reply:
/// `[total, key, [field, value, ...], key, [...], ...]`.
///
/// The `id` field is preferred; the key suffix is the fallback.
fn parse_search_ids(reply: Value) -> ExploreResult<Vec<Uuid>> {
    let Value::Array(items) = reply else {
        return Err(ExploreError::Upstream(
            "redis: unexpected FT.SEARCH reply".to_string(),
        ));
    };

    let mut ids = Vec::new();
    let mut rest = items.into_iter().skip(1);

    while let Some(key) = rest.next() {
        let fields = rest.next();

        let from_fields = match fields {
            Some(Value::Array(pairs)) => pairs
                .chunks(2)
                .find(|pair| value_to_string(&pair[0]).as_deref() == Some(ID_FIELD))
                .and_then(|pair| pair.get(1).and_then(value_to_string)),
            _ => None,
        };
        let from_key = value_to_string(&key)
            .and_then(|k| k.strip_prefix(KEY_PREFIX).map(str::to_string));

        let raw = from_fields.or(from_key).ok_or_else(|| {
            ExploreError::Upstream("redis: search hit without id".to_string())
        })?;
        let id = Uuid::parse_str(&raw)
            .map_err(|e| ExploreError::Upstream(format!("redis: bad id '{}': {}", raw, e)))?;
        ids.push(id);
    }

    Ok(ids)
}
