//! Mapping of request failures onto HTTP responses.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::tools::ToolError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("invalid JSON body: {0}")]
    Json(#[from] JsonRejection),

    #[error("invalid multipart body: {0}")]
    MultipartRejected(#[from] MultipartRejection),

    #[error("failed to read multipart body: {0}")]
    Multipart(#[from] MultipartError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Tool(ToolError::Validation(message)) => (StatusCode::BAD_REQUEST, message),
            ApiError::Tool(ToolError::Extraction(e)) => {
                error!("Error processing file: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error processing file".to_string(),
                )
            }
            ApiError::Tool(ToolError::Transport(e)) => {
                error!("Inference call failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server error: the AI service is unavailable".to_string(),
                )
            }
            ApiError::Json(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
            ApiError::MultipartRejected(rejection) => (rejection.status(), rejection.body_text()),
            ApiError::Multipart(e) => (e.status(), e.body_text()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
