//! Image payloads: raw file bytes ⇄ `data:<mime>;base64,<payload>` URIs.
//!
//! Image annotations carry their bytes as a data URI so an annotation is a
//! self-contained value (serialisable into a script, clonable into the
//! export task). The MIME type is sniffed from the bytes when the image is
//! uploaded; at export time the same MIME marker decides whether the image
//! embeds as PNG or JPEG.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};
use tracing::debug;

/// Image formats the compositor can embed into a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedFormat {
    Png,
    Jpeg,
}

impl EmbedFormat {
    /// Map a data-URI MIME marker onto an embeddable format.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.to_ascii_lowercase();
        if mime.contains("png") {
            Some(EmbedFormat::Png)
        } else if mime.contains("jpeg") || mime.contains("jpg") {
            Some(EmbedFormat::Jpeg)
        } else {
            None
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            EmbedFormat::Png => ImageFormat::Png,
            EmbedFormat::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// Encode uploaded image bytes as a data URI.
///
/// The format is inferred from the bytes, never declared by the caller.
/// Unrecognised bytes are labelled `application/octet-stream`; they can
/// still be stored but will not embed at export.
pub fn encode_image(bytes: &[u8]) -> String {
    let mime = image::guess_format(bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream");
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} image → {} bytes base64", mime, b64.len());
    format!("data:{mime};base64,{b64}")
}

/// Split a data URI into its MIME type and base64 payload.
pub fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    Some((mime, payload))
}

/// Decode a data URI into `(mime, bytes)`.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), String> {
    let (mime, payload) =
        split_data_uri(uri).ok_or_else(|| "not a base64 data URI".to_string())?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("invalid base64 payload: {e}"))?;
    Ok((mime.to_string(), bytes))
}

/// Decode image bytes in a known embed format.
pub fn decode_image(bytes: &[u8], format: EmbedFormat) -> Result<DynamicImage, image::ImageError> {
    image::load_from_memory_with_format(bytes, format.image_format())
}
