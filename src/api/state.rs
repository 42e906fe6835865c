use std::sync::Arc;

use crate::application::{IndexingService, SearchService, Summarizer};
use crate::domain::DomainError;
use crate::infrastructure::{vector_store, AppConfig, DeepSeekChat, DeepSeekEmbedding, UpstreamClient};

#[derive(Clone)]
pub struct AppState {
    pub indexing_service: Arc<IndexingService>,
    pub search_service: Arc<SearchService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        indexing_service: Arc<IndexingService>,
        search_service: Arc<SearchService>,
        config: AppConfig,
    ) -> Self {
        Self {
            indexing_service,
            search_service,
            config: Arc::new(config),
        }
    }

    /// Wires the upstream clients and the configured vector store.
    pub async fn from_config(config: AppConfig) -> Result<Self, DomainError> {
        let cfg = &config.config;
        let upstream = UpstreamClient::new(&cfg.upstream)?;
        if !upstream.has_credential() {
            tracing::warn!("DEEPSEEK_API_KEY not set; indexing and search will fail");
        }

        let embedding = Arc::new(DeepSeekEmbedding::from_config(upstream.clone(), &cfg.embedding));
        let chat = Arc::new(DeepSeekChat::from_config(upstream, &cfg.summary));
        let store = vector_store::connect(&cfg.vector_store, cfg.embedding.dimension).await?;

        let summarizer = Arc::new(Summarizer::new(chat, config.prompts.summary.clone()));
        let indexing_service = Arc::new(IndexingService::new(embedding.clone(), store.clone()));
        let search_service = Arc::new(
            SearchService::new(embedding, store, summarizer, cfg.search.clone())
                .with_summary_concurrency(cfg.summary.concurrency),
        );

        Ok(Self::new(indexing_service, search_service, config))
    }
}
