use crate::domain::{errors::DomainError, Document, Embedding, ScoredDocument};
use async_trait::async_trait;

/// Persistent collection of documents and their embeddings.
///
/// Every call is atomic on its own, except that a batch may be cut short.
/// Nothing spans calls.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, document: &Document, embedding: &Embedding) -> Result<(), DomainError>;

    /// Stores `batch` in order, stopping at the first record that fails.
    /// Records before it stay stored.
    async fn upsert_batch(&self, batch: &[(Document, Embedding)]) -> Result<(), DomainError> {
        for (document, embedding) in batch {
            self.upsert(document, embedding).await?;
        }
        Ok(())
    }

    /// Returns at most `top_k` documents ordered by ascending distance.
    async fn query(
        &self,
        embedding: &Embedding,
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>, DomainError>;

    async fn count(&self) -> Result<usize, DomainError>;

    fn collection(&self) -> &str;
}
