use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::domain::{
    ports::{EmbeddingService, VectorStore},
    Document, DomainError, Metadata, MetadataValue,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadedDocument {
    pub document_id: String,
    pub filename: String,
    pub content_length: usize,
}

pub struct IndexingService {
    embedding: Arc<dyn EmbeddingService>,
    store: Arc<dyn VectorStore>,
}

impl IndexingService {
    pub fn new(embedding: Arc<dyn EmbeddingService>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedding, store }
    }

    /// Embeds each document in order and stores the batch in one write.
    ///
    /// Stops at the first failure. Documents embedded before it are still
    /// stored.
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    pub async fn index_documents(&self, documents: &[Document]) -> Result<usize, DomainError> {
        let mut embedded = Vec::with_capacity(documents.len());
        let mut failure = None;

        for document in documents {
            match self.embedding.embed(&document.content).await {
                Ok(embedding) => embedded.push((document.clone(), embedding)),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        self.store.upsert_batch(&embedded).await?;
        if let Some(e) = failure {
            return Err(e);
        }

        info!(
            count = documents.len(),
            model = self.embedding.model(),
            "documents indexed"
        );
        Ok(documents.len())
    }

    /// Stores an uploaded text file under a fresh id.
    #[instrument(skip(self, bytes, metadata), fields(filename = %filename, size = bytes.len()))]
    pub async fn upload_document(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        metadata: Option<&str>,
    ) -> Result<UploadedDocument, DomainError> {
        let content = String::from_utf8(bytes)
            .map_err(|e| DomainError::decode(format!("file is not valid UTF-8 text: {e}")))?;

        let document =
            Document::from_upload(filename, content, parse_upload_metadata(metadata), Utc::now());
        let embedding = self.embedding.embed(&document.content).await?;
        self.store.upsert(&document, &embedding).await?;

        info!(document_id = %document.id, filename, "document uploaded");
        Ok(UploadedDocument {
            document_id: document.id,
            filename: filename.to_string(),
            content_length: document.content.len(),
        })
    }
}

/// Interprets the free-form metadata field sent with an upload.
///
/// A JSON object contributes its scalar entries; any other non-blank text is
/// kept under `description`.
pub fn parse_upload_metadata(raw: Option<&str>) -> Metadata {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Metadata::new();
    };

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => map
            .iter()
            .filter_map(|(k, v)| MetadataValue::from_json(v).map(|v| (k.clone(), v)))
            .collect(),
        _ => Metadata::from([("description".to_string(), MetadataValue::from(raw))]),
    }
}
