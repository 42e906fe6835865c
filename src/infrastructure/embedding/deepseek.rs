use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::EmbeddingConfig;
use crate::infrastructure::upstream::UpstreamClient;

/// Embeddings from the hosted model API, one request per text.
pub struct DeepSeekEmbedding {
    client: UpstreamClient,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl DeepSeekEmbedding {
    pub fn new(client: UpstreamClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn from_config(client: UpstreamClient, config: &EmbeddingConfig) -> Self {
        Self::new(client, config.model.clone())
    }
}

#[async_trait]
impl EmbeddingService for DeepSeekEmbedding {
    #[instrument(skip(self, text), fields(model = %self.model, text_len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        let request = EmbeddingRequest {
            input: text,
            model: &self.model,
        };

        let response: EmbeddingResponse = self.client.post_json("embeddings", &request).await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| Embedding::new(d.embedding))
            .filter(|e| e.dimension() > 0)
            .ok_or_else(|| DomainError::upstream("DeepSeek API returned no embedding"))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
