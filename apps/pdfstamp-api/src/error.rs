//! Error types for the pdfstamp API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdfstamp_core::StampError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid upload: {0}")]
    BadUpload(String),

    #[error(transparent)]
    Stamp(#[from] StampError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadUpload(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Stamp(e) => {
                tracing::error!("Signing failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
