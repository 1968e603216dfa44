//! HTTP handlers for the pdfstamp API

use axum::{
    extract::multipart::{Field, Multipart},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ApiError;
use crate::models::{RejectionResponse, UploadedFile};

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "pdfstamp API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Stamp the uploaded signature PNG onto the last page of the uploaded PDF.
///
/// Expects a multipart body with file fields `pdf` and `signature`. On
/// success the signed document is returned with the upload's declared MIME
/// type and a `Content-Disposition` attachment carrying the url-encoded
/// original filename.
pub async fn sign_document(mut multipart: Multipart) -> Result<Response, ApiError> {
    let mut pdf: Option<UploadedFile> = None;
    let mut signature: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadUpload(format!("Failed to read multipart field: {e}")))?
    {
        match field.name() {
            Some("pdf") => pdf = Some(read_file(field).await?),
            Some("signature") => signature = Some(read_file(field).await?),
            // Unknown fields are drained and ignored.
            _ => {}
        }
    }

    let (pdf, signature) = match (pdf, signature) {
        (Some(p), Some(s)) if !p.data.is_empty() && !s.data.is_empty() => (p, s),
        // Absent uploads answer 200 with a status payload, matching the
        // contract existing clients rely on.
        _ => return Ok((StatusCode::OK, Json(RejectionResponse::no_file())).into_response()),
    };

    let file_name = pdf.file_name.clone();
    let content_type = pdf.content_type.clone();

    tracing::info!(
        "Signing {} ({} bytes pdf, {} bytes signature)",
        file_name,
        pdf.data.len(),
        signature.data.len()
    );

    // The overlay is CPU-bound; keep it off the async runtime.
    let signed = tokio::task::spawn_blocking(move || {
        pdfstamp_core::overlay_signature(&pdf.data, &signature.data)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("overlay task panicked: {e}")))??;

    Ok(stamped_response(&file_name, &content_type, signed))
}

/// Build the download response, echoing the upload's declared MIME type.
/// An empty body is never a valid signed document and answers 400, still
/// under the declared MIME type.
fn stamped_response(file_name: &str, content_type: &str, signed: Vec<u8>) -> Response {
    if signed.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            [(header::CONTENT_TYPE, content_type.to_string())],
            format!("Something went wrong with {file_name}"),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", urlencoding::encode(file_name)),
            ),
        ],
        signed,
    )
        .into_response()
}

async fn read_file(field: Field<'_>) -> Result<UploadedFile, ApiError> {
    let file_name = field.file_name().unwrap_or("document.pdf").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadUpload(format!("Failed to read file data: {e}")))?;

    Ok(UploadedFile {
        file_name,
        content_type,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_output_echoes_declared_content_type() {
        let response = stamped_response("contract.pdf", "application/pdf", Vec::new());

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/pdf"
        );
        assert!(response.headers().get("content-disposition").is_none());
    }

    #[test]
    fn signed_output_carries_attachment_headers() {
        let response = stamped_response("my contract.pdf", "application/pdf", vec![b'%']);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-disposition").unwrap(),
            "attachment; filename=my%20contract.pdf"
        );
    }
}
