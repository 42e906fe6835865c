use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::{ports::LlmService, DomainError};
use crate::infrastructure::config::SummaryConfig;
use crate::infrastructure::upstream::UpstreamClient;

pub struct DeepSeekChat {
    client: UpstreamClient,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl DeepSeekChat {
    pub fn new(client: UpstreamClient, model: impl Into<String>) -> Self {
        let defaults = SummaryConfig::default();
        Self {
            client,
            model: model.into(),
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
        }
    }

    pub fn from_config(client: UpstreamClient, config: &SummaryConfig) -> Self {
        Self::new(client, config.model.clone())
            .with_max_tokens(config.max_tokens)
            .with_temperature(config.temperature)
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl LlmService for DeepSeekChat {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response: ChatResponse = self
            .client
            .post_json("chat/completions", &request)
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| DomainError::upstream("DeepSeek API returned no choices"))
    }
}
