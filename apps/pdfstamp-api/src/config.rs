//! Upload handling configuration

/// Default cap on the multipart body size: 25 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Configuration passed explicitly into the router constructor.
#[derive(Debug, Clone, Copy)]
pub struct UploadConfig {
    /// Maximum accepted multipart body size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl UploadConfig {
    /// Read overrides from the environment (`MAX_UPLOAD_BYTES`).
    pub fn from_env() -> Self {
        let max_upload_bytes = std::env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Self { max_upload_bytes }
    }
}
