pub mod config;
pub mod embedding;
pub mod llm;
pub mod upstream;
pub mod vector_store;

pub use config::{AppConfig, Config, ConfigError, PromptsConfig, VectorStoreBackend};
pub use embedding::DeepSeekEmbedding;
pub use llm::DeepSeekChat;
pub use upstream::UpstreamClient;
pub use vector_store::{DuplicatePolicy, InMemoryVectorStore, QdrantVectorStore};
