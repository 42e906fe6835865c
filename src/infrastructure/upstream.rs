//! Shared HTTP plumbing for the hosted model API.
//!
//! Both the embeddings and chat-completions clients speak OpenAI-shaped JSON
//! over HTTPS with bearer auth; this module owns the connection pool, the
//! request timeout and the mapping of transport failures onto `DomainError`.

use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error};

use crate::domain::DomainError;
use crate::infrastructure::config::UpstreamConfig;

#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("semantic-search/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DomainError::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POSTs `body` to `path` and decodes the JSON reply.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, DomainError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| DomainError::configuration("DEEPSEEK_API_KEY not set"))?;

        let url = self.endpoint(path);
        debug!(%url, "calling upstream");

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(%url, error = %e, "upstream request failed");
                if e.is_timeout() {
                    DomainError::timeout(format!("DeepSeek API did not answer in time: {e}"))
                } else {
                    DomainError::upstream(format!("DeepSeek API request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(%url, %status, "upstream returned error status");
            return Err(DomainError::upstream(format!(
                "DeepSeek API error: {status}: {detail}"
            )));
        }

        response.json::<R>().await.map_err(|e| {
            error!(%url, error = %e, "failed to parse upstream response");
            DomainError::upstream(format!("malformed DeepSeek API response: {e}"))
        })
    }
}
