use crate::domain::{errors::DomainError, Embedding};
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError>;
    fn model(&self) -> &str;
}
