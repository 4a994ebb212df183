//! Image encoding for inline request parts.
//!
//! Rendered PDF pages are sent as PNG: lossless output keeps small print
//! legible. Vertex AI expects inline bytes as standard base64.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rendered page as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} page as PNG ({} bytes)",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// Standard base64, as used by `inlineData.data`.
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
