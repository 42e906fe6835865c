use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::DomainError;

/// Error returned by handlers, rendered as `{"detail": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    BadRequest(String),
    /// Upload failures are reported under one generic message.
    Upload(DomainError),
    /// An extractor refused the request before the handler ran.
    Rejected { status: StatusCode, detail: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Domain(DomainError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Domain(_) | Self::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Rejected { status, .. } => *status,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            Self::Domain(DomainError::Configuration(msg)) => msg.clone(),
            Self::Domain(e) => e.to_string(),
            Self::BadRequest(msg) => msg.clone(),
            Self::Upload(e) => format!("Upload failed: {e}"),
            Self::Rejected { detail, .. } => detail.clone(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(inner: DomainError) -> Self {
        Self::Domain(inner)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.detail();

        if status.is_server_error() {
            tracing::error!(%status, %detail, "request failed");
        } else {
            tracing::debug!(%status, %detail, "request rejected");
        }

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
