use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::{error::ApiError, extract::AppJson, state::AppState};
use crate::domain::{Document, DomainError, Metadata};

#[derive(Debug, Deserialize)]
pub struct IndexDocumentRequest {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl From<IndexDocumentRequest> for Document {
    fn from(request: IndexDocumentRequest) -> Self {
        Self {
            id: request.id,
            content: request.content,
            metadata: request.metadata,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub status: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadDocumentResponse {
    pub status: String,
    pub document_id: String,
    pub filename: String,
    pub content_length: usize,
}

pub async fn index_documents(
    State(state): State<AppState>,
    AppJson(request): AppJson<Vec<IndexDocumentRequest>>,
) -> Result<Json<IndexResponse>, ApiError> {
    if request.iter().any(|d| d.id.trim().is_empty()) {
        return Err(DomainError::validation("every document needs a non-empty id").into());
    }

    let documents: Vec<Document> = request.into_iter().map(Document::from).collect();
    let count = state.indexing_service.index_documents(&documents).await?;

    Ok(Json(IndexResponse {
        status: "indexed".to_string(),
        count,
    }))
}

pub async fn upload_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadDocumentResponse>, ApiError> {
    let mut multipart = multipart?;
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut metadata: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload.txt").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("metadata") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                metadata = Some(text);
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("missing 'file' field".to_string()))?;

    let uploaded = state
        .indexing_service
        .upload_document(&filename, bytes, metadata.as_deref())
        .await
        .map_err(ApiError::Upload)?;

    Ok(Json(UploadDocumentResponse {
        status: "uploaded".to_string(),
        document_id: uploaded.document_id,
        filename: uploaded.filename,
        content_length: uploaded.content_length,
    }))
}
