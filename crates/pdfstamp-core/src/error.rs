use thiserror::Error;

#[derive(Error, Debug)]
pub enum StampError {
    #[error("Failed to parse PDF: {0}")]
    MalformedPdf(String),

    #[error("Unsupported signature image: {0}")]
    UnsupportedImage(String),

    #[error("Document has no pages")]
    NoPages,

    #[error("Failed to serialize PDF: {0}")]
    SaveFailed(String),
}
