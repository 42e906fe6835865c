mod indexing;
mod search;
mod summarizer;

pub use indexing::{parse_upload_metadata, IndexingService, UploadedDocument};
pub use search::SearchService;
pub use summarizer::Summarizer;
