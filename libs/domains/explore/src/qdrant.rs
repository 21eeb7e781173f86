//! Qdrant vector index. Point id is the user's UUID; the plain id is also
//! stored in the payload.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    self, CreateCollectionBuilder, Distance, GetPointsBuilder, PointId, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{ExploreError, ExploreResult};
use crate::filter::{Filter, ID_FIELD};
use crate::models::EmbeddingVector;
use crate::repository::EmbeddingRepository;

pub const DEFAULT_COLLECTION: &str = "match_embeddings";

pub struct QdrantEmbeddingRepository {
    client: Qdrant,
    collection: String,
    dim: usize,
}

impl QdrantEmbeddingRepository {
    pub fn connect(
        url: &str,
        api_key: Option<String>,
        timeout: Duration,
        dim: usize,
    ) -> ExploreResult<Self> {
        let mut builder = Qdrant::from_url(url);

        if let Some(api_key) = api_key {
            builder = builder.api_key(api_key);
        }

        let client = builder
            .timeout(timeout)
            .build()
            .map_err(|e| ExploreError::Upstream(format!("qdrant: failed to build client: {}", e)))?;

        Ok(Self::from_client(client, DEFAULT_COLLECTION, dim))
    }

    pub fn from_client(client: Qdrant, collection: impl Into<String>, dim: usize) -> Self {
        Self {
            client,
            collection: collection.into(),
            dim,
        }
    }

    fn point_id(id: Uuid) -> PointId {
        PointId::from(id.to_string())
    }

    fn point_id_to_uuid(point_id: &PointId) -> ExploreResult<Uuid> {
        match &point_id.point_id_options {
            Some(qdrant::point_id::PointIdOptions::Uuid(raw)) => Uuid::parse_str(raw)
                .map_err(|e| ExploreError::Upstream(format!("qdrant: bad point id: {}", e))),
            Some(qdrant::point_id::PointIdOptions::Num(num)) => Ok(Uuid::from_u128(*num as u128)),
            None => Err(ExploreError::Upstream("qdrant: missing point id".to_string())),
        }
    }

    fn extract_vector(vectors: &Option<qdrant::VectorsOutput>) -> Option<Vec<f32>> {
        match vectors {
            Some(qdrant::VectorsOutput {
                vectors_options: Some(qdrant::vectors_output::VectorsOptions::Vector(v)),
            }) => Some(v.data.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl EmbeddingRepository for QdrantEmbeddingRepository {
    #[instrument(skip(self, vector), fields(collection = %self.collection))]
    async fn set_embedding(&self, user_id: Uuid, vector: EmbeddingVector) -> ExploreResult<()> {
        let payload: HashMap<String, QdrantValue> =
            HashMap::from([(ID_FIELD.to_string(), QdrantValue::from(user_id.to_string()))]);
        let point = PointStruct::new(Self::point_id(user_id), vector.0, payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn get_embedding(&self, user_id: Uuid) -> ExploreResult<Option<EmbeddingVector>> {
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(&self.collection, vec![Self::point_id(user_id)])
                    .with_vectors(true)
                    .with_payload(false),
            )
            .await?;

        Ok(response
            .result
            .first()
            .and_then(|point| Self::extract_vector(&point.vectors))
            .map(EmbeddingVector::new))
    }

    #[instrument(skip(self, query, filter), fields(collection = %self.collection, k = k))]
    async fn knn(
        &self,
        query: &EmbeddingVector,
        k: usize,
        filter: &Filter,
    ) -> ExploreResult<Vec<Uuid>> {
        let mut builder = SearchPointsBuilder::new(&self.collection, query.0.clone(), k as u64)
            .with_payload(false)
            .with_vectors(false);

        if let Some(filter) = filter.to_qdrant() {
            builder = builder.filter(filter);
        }

        // Cosine scores are similarities, so descending score is ascending distance
        let response = self.client.search_points(builder).await?;

        response
            .result
            .iter()
            .map(|point| {
                point
                    .id
                    .as_ref()
                    .ok_or_else(|| ExploreError::Upstream("qdrant: missing point id".to_string()))
                    .and_then(Self::point_id_to_uuid)
            })
            .collect()
    }

    async fn ensure_index(&self) -> ExploreResult<()> {
        if self.client.collection_exists(&self.collection).await? {
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(self.dim as u64, Distance::Cosine)),
            )
            .await?;

        info!(collection = %self.collection, dim = self.dim, "qdrant collection created");
        Ok(())
    }
}
