mod document;
mod embedding;
mod search;

pub use document::{Document, Metadata, MetadataValue, ScoredDocument};
pub use embedding::{DistanceMetric, Embedding};
pub use search::{
    derive_suggestions, DocumentStats, SearchQuery, SearchResult, SearchSuggestion, DEFAULT_TOP_K,
};
