//! pdfstamp API server - HTTP surface for PDF signature stamping
//!
//! A single signing endpoint: POST a PDF and a PNG signature as a
//! multipart upload, get the PDF back with the signature stamped onto
//! its last page.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod error;
mod handlers;
mod models;

pub use config::{UploadConfig, DEFAULT_MAX_UPLOAD_BYTES};
pub use error::ApiError;
pub use models::RejectionResponse;

/// Build the application router with all routes configured.
pub fn app(config: UploadConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/sign", post(handlers::sign_document))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
