//! Signature overlay for existing PDFs
//!
//! This crate stamps a PNG signature image onto the last page of a PDF
//! using lopdf. The image is embedded as an Image XObject (with SMask
//! transparency when the PNG has alpha) and drawn at a fixed offset from
//! the page center at half its native size.

pub mod error;
pub mod image;
pub mod stamp;

pub use error::StampError;
pub use image::SignatureImage;
pub use stamp::{
    overlay_signature, page_count, placement, SIGNATURE_SCALE, X_CENTER_OFFSET, Y_BASELINE_OFFSET,
};
