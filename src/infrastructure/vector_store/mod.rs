mod in_memory;
mod qdrant;

pub use in_memory::InMemoryVectorStore;
pub use qdrant::QdrantVectorStore;

use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::domain::{ports::VectorStore, DomainError};
use crate::infrastructure::config::{VectorStoreBackend, VectorStoreConfig};

/// What a store does when a document id is already present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Replace the stored record.
    #[default]
    Overwrite,
    /// Fail the upsert and keep the stored record.
    Reject,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown duplicate policy '{other}'")),
        }
    }
}

/// Opens the configured backend.
pub async fn connect(
    config: &VectorStoreConfig,
    dimension: usize,
) -> Result<Arc<dyn VectorStore>, DomainError> {
    match config.backend {
        VectorStoreBackend::Memory => {
            let store = match &config.path {
                Some(dir) => InMemoryVectorStore::open(dir, &config.collection)?,
                None => InMemoryVectorStore::new(&config.collection),
            };
            info!(collection = %config.collection, path = ?config.path, "using embedded vector store");
            Ok(Arc::new(
                store
                    .with_metric(config.metric)
                    .with_duplicate_policy(config.duplicates),
            ))
        }
        VectorStoreBackend::Qdrant => {
            let store = QdrantVectorStore::new(
                &config.qdrant_url,
                &config.collection,
                dimension,
                config.metric,
            )
            .await?;
            info!(collection = %config.collection, url = %config.qdrant_url, "using qdrant vector store");
            Ok(Arc::new(store.with_duplicate_policy(config.duplicates)))
        }
    }
}
