use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::application::Summarizer;
use crate::domain::{
    derive_suggestions,
    ports::{EmbeddingService, VectorStore},
    DocumentStats, DomainError, SearchQuery, SearchResult, SearchSuggestion,
};
use crate::infrastructure::config::SearchConfig;

pub struct SearchService {
    embedding: Arc<dyn EmbeddingService>,
    store: Arc<dyn VectorStore>,
    summarizer: Arc<Summarizer>,
    config: SearchConfig,
    summary_concurrency: usize,
}

impl SearchService {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        store: Arc<dyn VectorStore>,
        summarizer: Arc<Summarizer>,
        config: SearchConfig,
    ) -> Self {
        Self {
            embedding,
            store,
            summarizer,
            config,
            summary_concurrency: 1,
        }
    }

    pub fn with_summary_concurrency(mut self, concurrency: usize) -> Self {
        self.summary_concurrency = concurrency.max(1);
        self
    }

    pub fn default_top_k(&self) -> usize {
        self.config.default_top_k
    }

    /// Nearest documents to the query, best first, each with a summary.
    ///
    /// Summaries are generated with at most `summary_concurrency` in flight;
    /// results keep the store's order either way.
    #[instrument(skip(self, query), fields(top_k = query.top_k))]
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, DomainError> {
        query.validate(self.config.max_top_k)?;

        let embedding = self.embedding.embed(&query.query).await?;
        let hits = self.store.query(&embedding, query.top_k).await?;

        let question = query.query.as_str();
        let results = stream::iter(hits)
            .map(|hit| async move {
                let summary = self.summarizer.summarize(&hit.content, question).await;
                SearchResult::from_scored(hit, summary)
            })
            .buffered(self.summary_concurrency)
            .collect::<Vec<_>>()
            .await;

        Ok(results)
    }

    /// Best-effort suggestions for a partial query; failures yield nothing.
    #[instrument(skip(self))]
    pub async fn suggestions(&self, partial: &str) -> Vec<SearchSuggestion> {
        // Length is measured after trimming: " b " counts as one character.
        let partial = partial.trim();
        if partial.chars().count() < self.config.min_suggestion_chars {
            return Vec::new();
        }

        match self.try_suggestions(partial).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                warn!(error = %e, "suggestions unavailable");
                Vec::new()
            }
        }
    }

    async fn try_suggestions(&self, partial: &str) -> Result<Vec<SearchSuggestion>, DomainError> {
        let embedding = self.embedding.embed(partial).await?;
        let hits = self
            .store
            .query(&embedding, self.config.suggestion_neighbors)
            .await?;

        Ok(derive_suggestions(
            hits.iter().map(|h| h.content.as_str()),
            self.config.suggestion_tokens,
            self.config.max_suggestions,
        ))
    }

    /// Collection size; a failing store is reported in the body, not raised.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> DocumentStats {
        match self.store.count().await {
            Ok(total) => DocumentStats::new(total, self.store.collection()),
            Err(e) => {
                warn!(error = %e, "document stats unavailable");
                DocumentStats::unavailable(e.to_string())
            }
        }
    }
}
