use std::sync::Arc;
use tracing::{instrument, warn};

use crate::domain::ports::LlmService;

pub const MISSING_KEY_PLACEHOLDER: &str = "Summary unavailable (API key not set)";

/// Query-contextualised summaries. Never fails: a summary is presentation
/// only, so any error becomes a placeholder string.
pub struct Summarizer {
    llm: Arc<dyn LlmService>,
    template: String,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn LlmService>, template: impl Into<String>) -> Self {
        Self {
            llm,
            template: template.into(),
        }
    }

    #[instrument(skip(self, content, query), fields(content_len = content.len()))]
    pub async fn summarize(&self, content: &str, query: &str) -> String {
        let prompt = self.render(content, query);

        match self.llm.complete(&prompt).await {
            Ok(summary) => summary,
            Err(e) if e.is_configuration() => MISSING_KEY_PLACEHOLDER.to_string(),
            Err(e) => {
                warn!(error = %e, "summary generation failed");
                format!("Summary unavailable: {e}")
            }
        }
    }

    /// Fills `{query}` and `{content}` without re-expanding placeholders that
    /// appear inside the substituted text.
    fn render(&self, content: &str, query: &str) -> String {
        self.template
            .split("{content}")
            .map(|part| part.replace("{query}", query))
            .collect::<Vec<_>>()
            .join(content)
    }
}
