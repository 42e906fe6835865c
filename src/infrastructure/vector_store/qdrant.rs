use async_trait::async_trait;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, GetPointsBuilder, PointId, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use uuid::Uuid;

use crate::domain::{
    ports::VectorStore, DistanceMetric, Document, DomainError, Embedding, Metadata,
    ScoredDocument,
};
use crate::infrastructure::vector_store::DuplicatePolicy;

pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
    metric: DistanceMetric,
    duplicates: DuplicatePolicy,
}

impl QdrantVectorStore {
    pub async fn new(
        url: &str,
        collection: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<Self, DomainError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| DomainError::store(e.to_string()))?;

        let store = Self {
            client,
            collection: collection.to_string(),
            dimension,
            metric,
            duplicates: DuplicatePolicy::default(),
        };

        store.ensure_collection().await?;

        Ok(store)
    }

    pub fn with_duplicate_policy(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    async fn ensure_collection(&self) -> Result<(), DomainError> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| DomainError::store(e.to_string()))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, qdrant_distance(self.metric)),
                    ),
                )
                .await
                .map_err(|e| DomainError::store(e.to_string()))?;
        }

        Ok(())
    }

    /// Qdrant only accepts integer or UUID point ids, so caller ids are
    /// mapped onto a name-based UUID and kept verbatim in the payload.
    fn point_id(id: &str) -> PointId {
        PointId::from(Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string())
    }

    async fn exists(&self, id: &str) -> Result<bool, DomainError> {
        let response = self
            .client
            .get_points(GetPointsBuilder::new(&self.collection, vec![Self::point_id(id)]))
            .await
            .map_err(|e| DomainError::store(e.to_string()))?;
        Ok(!response.result.is_empty())
    }
}

fn qdrant_distance(metric: DistanceMetric) -> Distance {
    match metric {
        DistanceMetric::Cosine => Distance::Cosine,
        DistanceMetric::L2 => Distance::Euclid,
        DistanceMetric::InnerProduct => Distance::Dot,
    }
}

/// Qdrant reports similarity for cosine and dot, plain distance for euclid;
/// normalise to "lower is closer" on the same scale as the embedded store.
fn to_distance(metric: DistanceMetric, score: f32) -> f32 {
    match metric {
        DistanceMetric::Cosine => 1.0 - score,
        DistanceMetric::L2 => score * score,
        DistanceMetric::InnerProduct => -score,
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    /// Under `DuplicatePolicy::Reject` the existence check and the write are
    /// separate requests, so two concurrent upserts of a new id can both
    /// succeed. The policy is best-effort on this backend.
    async fn upsert(&self, document: &Document, embedding: &Embedding) -> Result<(), DomainError> {
        if embedding.dimension() != self.dimension {
            return Err(DomainError::store(format!(
                "embedding dimension {} does not match collection dimension {}",
                embedding.dimension(),
                self.dimension
            )));
        }

        if self.duplicates == DuplicatePolicy::Reject && self.exists(&document.id).await? {
            return Err(DomainError::store(format!(
                "document '{}' already exists",
                document.id
            )));
        }

        let metadata = serde_json::to_string(&document.metadata)
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let payload: Payload = serde_json::json!({
            "document_id": document.id,
            "content": document.content,
            "metadata": metadata,
        })
        .try_into()
        .map_err(|_| DomainError::internal("Failed to create payload"))?;

        let point = PointStruct::new(
            Self::point_id(&document.id),
            embedding.as_slice().to_vec(),
            payload,
        );

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await
            .map_err(|e| DomainError::store(e.to_string()))?;

        Ok(())
    }

    async fn query(
        &self,
        embedding: &Embedding,
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>, DomainError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(
                    &self.collection,
                    embedding.as_slice().to_vec(),
                    top_k as u64,
                )
                .with_payload(true),
            )
            .await
            .map_err(|e| DomainError::store(e.to_string()))?;

        let mut documents: Vec<ScoredDocument> = results
            .result
            .into_iter()
            .filter_map(|point| {
                let payload = point.payload;

                let id = payload.get("document_id")?.as_str()?.to_string();
                let content = payload.get("content")?.as_str()?.to_string();
                let metadata: Metadata = payload
                    .get("metadata")
                    .and_then(|v| v.as_str())
                    .and_then(|raw| serde_json::from_str(raw).ok())
                    .unwrap_or_default();

                Some(ScoredDocument {
                    id,
                    content,
                    metadata,
                    distance: to_distance(self.metric, point.score),
                })
            })
            .collect();

        documents.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        Ok(documents)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(|e| DomainError::store(e.to_string()))?;

        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
