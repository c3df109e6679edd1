use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::ingestion::RejectedRow;

/// Failures of the storage layer
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Failed to encode document: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    #[error("Failed to decode document: {0}")]
    Decode(#[from] mongodb::bson::de::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Request- or batch-fatal failures of an upload.
///
/// Per-row problems never show up here; they are collected into
/// [`crate::models::ingestion::IngestionOutcome`] instead.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Unsupported file format {0:?}: only CSV or Excel files are allowed")]
    UnsupportedFormat(String),

    #[error("Could not read uploaded file: {0}")]
    UnreadableFile(String),

    #[error("Invalid upload metadata: {0}")]
    InvalidMetadata(String),

    #[error("No valid rows could be processed from the provided data")]
    NoValidRows(Vec<RejectedRow>),

    #[error("Failed to persist batch: {0}")]
    Persistence(#[from] StoreError),
}

impl IngestError {
    /// Machine-readable classification sent to clients
    pub fn classification(&self) -> &'static str {
        match self {
            IngestError::MissingColumns(_) => "missing columns",
            IngestError::UnsupportedFormat(_) => "unsupported format",
            IngestError::UnreadableFile(_) => "unreadable file",
            IngestError::InvalidMetadata(_) => "invalid metadata",
            IngestError::NoValidRows(_) => "no valid rows",
            IngestError::Persistence(_) => "persistence failure",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            IngestError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Failures of the non-upload service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error returned by HTTP handlers; renders as a JSON body
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::BadRequest(msg) => ApiError::BadRequest(msg),
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ServiceError::Store(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, classification, rejected) = match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "bad request", None)
            }
            // Exceeding the body limit surfaces here as 413
            ApiError::Multipart(err) => (err.status(), "invalid upload", None),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not found", None),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal error", None),
            ApiError::Ingest(err) => {
                let status = err.status_code();
                let classification = err.classification();
                match err {
                    IngestError::NoValidRows(rejected) => (status, classification, Some(rejected)),
                    _ => (status, classification, None),
                }
            }
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", message);
        } else {
            tracing::warn!(status = status.as_u16(), "{}", message);
        }

        let mut body = json!({
            "error": classification,
            "message": message,
            "status": status.as_u16(),
        });
        if let Some(rejected) = rejected {
            body["rejected"] = json!(rejected);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_map_to_400_and_store_errors_to_500() {
        assert_eq!(
            IngestError::UnsupportedFormat("notes.txt".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            IngestError::NoValidRows(Vec::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        let store = IngestError::from(StoreError::Unavailable("down".into()));
        assert_eq!(store.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.classification(), "persistence failure");
    }

    #[test]
    fn service_errors_map_to_api_errors() {
        let not_found = ApiError::from(ServiceError::NotFound("Student asha not found".into()));
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let store = ApiError::from(ServiceError::Store(StoreError::Unavailable("down".into())));
        assert_eq!(
            store.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let ingest = ApiError::from(IngestError::MissingColumns(vec!["Year".into()]));
        assert_eq!(ingest.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_columns_message_names_every_column() {
        let err = IngestError::MissingColumns(vec!["CorrectAnswer".into(), "Option4".into()]);
        assert_eq!(err.to_string(), "Missing columns: CorrectAnswer, Option4");
    }
}
