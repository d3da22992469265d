//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use recall_types::error::{PipelineError, RepositoryError, RetrievalError};
use recall_types::turn::FinalizedTurn;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Turn processing errors.
    Pipeline(PipelineError),
    /// Similarity search errors.
    Retrieval(RetrievalError),
    /// Direct repository reads.
    Repository(RepositoryError),
    /// Requested entity does not exist.
    NotFound(String),
    /// Validation error.
    Validation(String),
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        AppError::Pipeline(e)
    }
}

impl From<RetrievalError> for AppError {
    fn from(e: RetrievalError) -> Self {
        AppError::Retrieval(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Repository(e)
    }
}

impl AppError {
    fn partial_record(&self) -> Option<&FinalizedTurn> {
        match self {
            AppError::Pipeline(e) => e.partial_record(),
            _ => None,
        }
    }

    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Pipeline(PipelineError::InvalidTurn(e)) => {
                (StatusCode::BAD_REQUEST, "INVALID_TURN", e.to_string())
            }
            AppError::Pipeline(e @ PipelineError::ClassificationFailed { .. }) => {
                (StatusCode::BAD_GATEWAY, "CLASSIFICATION_FAILED", e.to_string())
            }
            AppError::Pipeline(e @ PipelineError::PersistenceFailed { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, "PERSISTENCE_FAILED", e.to_string())
            }
            AppError::Retrieval(
                e @ (RetrievalError::EmptyEmbedding | RetrievalError::NonFiniteEmbedding { .. }),
            ) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Retrieval(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SEARCH_FAILED", e.to_string())
            }
            AppError::Repository(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "REPOSITORY_ERROR", e.to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        // A persistence failure still carries the finalized record so the
        // caller can resubmit it.
        let details = self
            .partial_record()
            .and_then(|record| serde_json::to_value(record).ok());

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
                "details": details,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
