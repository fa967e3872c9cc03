//! Error types for the pdf-annotator library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`EditorError`] — **Fatal**: the operation cannot proceed at all
//!   (wrong input type, corrupt PDF, collaborator request failed). Returned
//!   as `Err(EditorError)` from loading, exporting and service calls.
//!
//! * [`AnnotationError`] — **Non-fatal**: a single annotation could not be
//!   drawn (undecodable image, page missing from the document) but every
//!   other annotation is fine. Collected in
//!   [`crate::export::ExportStats::failures`] so callers can inspect what was
//!   skipped instead of losing the whole export to one bad mark.

use crate::annotation::AnnotationId;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-annotator library.
#[derive(Debug, Error)]
pub enum EditorError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The declared content type is not the one accepted format (PDF).
    #[error("Unsupported format '{declared}': only application/pdf documents can be edited")]
    UnsupportedFormat { declared: String },

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// A caller-supplied value was rejected before any work started.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The bytes are not a readable PDF.
    #[error("Failed to parse PDF: {detail}")]
    ParseFailure { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF")]
    WrongPassword,

    /// An annotation targets a page the document does not have.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: u32, total: u32 },

    // ── Session errors ────────────────────────────────────────────────────
    /// An export was requested while another one is still running.
    #[error("An export is already in progress for this session")]
    ExportInProgress,

    // ── Collaborator errors ───────────────────────────────────────────────
    /// A hosted function request failed or returned an error payload.
    #[error("Service '{service}' failed: {detail}")]
    ExternalServiceFailure { service: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the exported PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the binary, install it system-wide, or\n\
set PDFIUM_LIB_PATH=/path/to/libpdfium.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single annotation.
///
/// Stored in [`crate::export::ExportStats`] when an annotation is skipped.
/// The export continues with the remaining annotations.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum AnnotationError {
    /// The annotation targets a page missing from the exported document.
    #[error("Annotation {id}: page {page} does not exist (document has {total} pages)")]
    PageOutOfRange { id: AnnotationId, page: u32, total: u32 },

    /// The data URI names an image type that cannot be embedded.
    #[error("Annotation {id}: image type '{mime}' cannot be embedded (PNG or JPEG only)")]
    UnsupportedImageFormat { id: AnnotationId, mime: String },

    /// The data URI is malformed or its payload is not valid base64.
    #[error("Annotation {id}: invalid image data: {detail}")]
    InvalidImageData { id: AnnotationId, detail: String },

    /// The image payload could not be decoded.
    #[error("Annotation {id}: image decode failed: {detail}")]
    ImageDecodeFailed { id: AnnotationId, detail: String },

    /// pdfium refused to create the page object.
    #[error("Annotation {id}: drawing on page {page} failed: {detail}")]
    DrawFailed {
        id: AnnotationId,
        page: u32,
        detail: String,
    },
}

impl AnnotationError {
    /// The annotation this failure belongs to.
    pub fn id(&self) -> AnnotationId {
        match self {
            AnnotationError::PageOutOfRange { id, .. }
            | AnnotationError::UnsupportedImageFormat { id, .. }
            | AnnotationError::InvalidImageData { id, .. }
            | AnnotationError::ImageDecodeFailed { id, .. }
            | AnnotationError::DrawFailed { id, .. } => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn unsupported_format_display() {
        let e = EditorError::UnsupportedFormat {
            declared: "image/png".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("image/png"), "got: {msg}");
        assert!(msg.contains("application/pdf"), "got: {msg}");
    }

    #[test]
    fn page_out_of_range_display() {
        let e = EditorError::PageOutOfRange { page: 7, total: 2 };
        assert!(e.to_string().contains("Page 7"));
        assert!(e.to_string().contains("2 pages"));
    }

    #[test]
    fn service_failure_display() {
        let e = EditorError::ExternalServiceFailure {
            service: "youtube-search".into(),
            detail: "HTTP 500".into(),
        };
        assert!(e.to_string().contains("youtube-search"));
        assert!(e.to_string().contains("HTTP 500"));
    }

    #[test]
    fn annotation_error_reports_its_id() {
        let id = Uuid::new_v4();
        let e = AnnotationError::UnsupportedImageFormat {
            id,
            mime: "image/gif".into(),
        };
        assert_eq!(e.id(), id);
        assert!(e.to_string().contains("image/gif"));
    }

    #[test]
    fn annotation_error_is_serialisable() {
        let e = AnnotationError::ImageDecodeFailed {
            id: Uuid::nil(),
            detail: "truncated".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: AnnotationError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
