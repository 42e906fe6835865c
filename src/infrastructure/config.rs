use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::domain::{DistanceMetric, DEFAULT_TOP_K};
use crate::infrastructure::vector_store::DuplicatePolicy;

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub upstream: UpstreamConfig,
    pub embedding: EmbeddingConfig,
    pub summary: SummaryConfig,
    pub vector_store: VectorStoreConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origin: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin: "http://localhost:5173".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Bearer credential for the model API. Optional at startup; requests that
    /// need it fail individually when it is absent.
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "deepseek-embed".to_string(),
            dimension: 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Summaries generated at once per search. 1 keeps them sequential.
    pub concurrency: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model: "deepseek-chat".to_string(),
            max_tokens: 60,
            temperature: 0.3,
            concurrency: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreBackend {
    #[default]
    Memory,
    Qdrant,
}

impl FromStr for VectorStoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "local" => Ok(Self::Memory),
            "qdrant" => Ok(Self::Qdrant),
            other => Err(format!("unknown vector store backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub backend: VectorStoreBackend,
    /// Directory holding the embedded store's data. `None` keeps it in memory.
    pub path: Option<PathBuf>,
    pub collection: String,
    pub metric: DistanceMetric,
    pub duplicates: DuplicatePolicy,
    pub qdrant_url: String,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorStoreBackend::Memory,
            path: Some(PathBuf::from("./vector_data")),
            collection: "documents".to_string(),
            metric: DistanceMetric::Cosine,
            duplicates: DuplicatePolicy::Overwrite,
            qdrant_url: "http://localhost:6334".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub min_suggestion_chars: usize,
    pub suggestion_neighbors: usize,
    pub suggestion_tokens: usize,
    pub max_suggestions: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: DEFAULT_TOP_K,
            max_top_k: 100,
            min_suggestion_chars: 2,
            suggestion_neighbors: 3,
            suggestion_tokens: 10,
            max_suggestions: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Template with `{query}` and `{content}` placeholders.
    pub summary: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            summary: "Summarize the following content in the context of the query: '{query}'.\nContent: {content}".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(flatten)]
    pub config: Config,
    #[serde(default)]
    pub prompts: PromptsConfig,
}

impl AppConfig {
    /// Defaults, then the YAML file (`$CONFIG_PATH` or `./config.yaml`), then
    /// environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut app = match config_path() {
            Some(path) => Self::from_yaml_file(&path)?,
            None => Self::default(),
        };
        app.apply_env(|key| std::env::var(key).ok())?;
        Ok(app)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Applies overrides from `lookup`. Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let cfg = &mut self.config;

        if let Some(key) = get("DEEPSEEK_API_KEY") {
            cfg.upstream.api_key = Some(key);
        }
        if let Some(url) = get("DEEPSEEK_BASE_URL") {
            cfg.upstream.base_url = url;
        }
        if let Some(secs) = get("UPSTREAM_TIMEOUT_SECONDS") {
            cfg.upstream.timeout_seconds = parse_value("UPSTREAM_TIMEOUT_SECONDS", &secs)?;
        }
        if let Some(origin) = get("CORS_ALLOWED_ORIGIN") {
            cfg.cors.allowed_origin = origin;
        }
        if let Some(backend) = get("VECTOR_STORE_BACKEND") {
            cfg.vector_store.backend = parse_value("VECTOR_STORE_BACKEND", &backend)?;
        }
        if let Some(path) = get("VECTOR_STORE_PATH") {
            cfg.vector_store.path = Some(PathBuf::from(path));
        }
        if let Some(name) = get("COLLECTION_NAME") {
            cfg.vector_store.collection = name;
        }
        if let Some(url) = get("QDRANT_URL") {
            cfg.vector_store.qdrant_url = url;
        }
        if let Some(host) = get("SERVER_HOST") {
            cfg.server.host = host;
        }
        if let Some(port) = get("SERVER_PORT") {
            cfg.server.port = parse_value("SERVER_PORT", &port)?;
        }

        Ok(())
    }
}

fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("CONFIG_PATH") {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from("config.yaml");
    local.exists().then_some(local)
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
