//! Data models for the pdfstamp API

use axum::body::Bytes;
use serde::{Deserialize, Serialize};

/// One file captured from the multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original filename as declared by the client.
    pub file_name: String,
    /// MIME type as declared by the client, echoed back on success.
    pub content_type: String,
    pub data: Bytes,
}

/// Payload returned when the required upload fields are absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionResponse {
    pub status: bool,
    pub message: String,
}

impl RejectionResponse {
    pub fn no_file() -> Self {
        Self {
            status: false,
            message: "No file uploaded".to_string(),
        }
    }
}
