//! Document loading: validate the declared type, parse once, keep geometry.
//!
//! The loader never hands out a live pdfium document. It parses the bytes,
//! records the page geometry the editor needs (page count and per-page
//! size for coordinate conversion and the preview surface), and returns a
//! [`LoadedDocument`] that owns the original bytes. Export later re-parses
//! those same bytes into a fresh copy, so the editable source can never be
//! corrupted by a failed export.

use crate::error::EditorError;
use crate::pipeline::bind::pdfium;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// The one content type the pipeline accepts.
pub const PDF_MIME: &str = "application/pdf";

/// Declared type of plain-text analysis inputs.
pub const TEXT_MIME: &str = "text/plain";

/// Size of one page in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

/// A successfully parsed document: original bytes plus page geometry.
#[derive(Clone)]
pub struct LoadedDocument {
    bytes: Arc<[u8]>,
    pages: Vec<PageGeometry>,
    password: Option<String>,
}

impl fmt::Debug for LoadedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedDocument")
            .field("bytes", &self.bytes.len())
            .field("pages", &self.pages.len())
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl LoadedDocument {
    /// Assemble a document from already-known geometry.
    pub fn from_parts(bytes: impl Into<Arc<[u8]>>, pages: Vec<PageGeometry>) -> Self {
        Self {
            bytes: bytes.into(),
            pages,
            password: None,
        }
    }

    /// The original, unmodified bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// True for `1..=page_count()`.
    pub fn contains_page(&self, page: u32) -> bool {
        page >= 1 && page <= self.page_count()
    }

    /// Height of a 1-based page, in points.
    pub fn page_height(&self, page: u32) -> Option<f32> {
        self.page(page).map(|g| g.height)
    }

    /// Width of a 1-based page, in points.
    pub fn page_width(&self, page: u32) -> Option<f32> {
        self.page(page).map(|g| g.width)
    }

    pub fn geometry(&self) -> &[PageGeometry] {
        &self.pages
    }

    fn page(&self, page: u32) -> Option<&PageGeometry> {
        if page == 0 {
            return None;
        }
        self.pages.get(page as usize - 1)
    }
}

/// Reject anything not declared as a PDF. Parameters (`; charset=…`) and
/// case are ignored.
pub fn check_declared_type(declared: &str) -> Result<(), EditorError> {
    let essence = declared.split(';').next().unwrap_or("").trim();
    if essence.eq_ignore_ascii_case(PDF_MIME) {
        Ok(())
    } else {
        Err(EditorError::UnsupportedFormat {
            declared: declared.to_string(),
        })
    }
}

/// Parse `bytes` declared as `declared_type`.
///
/// Fails with [`EditorError::UnsupportedFormat`] before touching pdfium when
/// the declared type is wrong, and with [`EditorError::ParseFailure`] when the
/// bytes cannot be parsed. Not retried.
pub async fn load_document(
    bytes: Vec<u8>,
    declared_type: &str,
    password: Option<&str>,
) -> Result<LoadedDocument, EditorError> {
    check_declared_type(declared_type)?;

    let bytes: Arc<[u8]> = Arc::from(bytes);
    let password = password.map(str::to_string);
    let task_bytes = Arc::clone(&bytes);
    let task_password = password.clone();

    let pages = tokio::task::spawn_blocking(move || {
        read_geometry_blocking(&task_bytes, task_password.as_deref())
    })
    .await
    .map_err(|e| EditorError::Internal(format!("Load task panicked: {}", e)))??;

    info!("PDF loaded: {} pages", pages.len());

    Ok(LoadedDocument {
        bytes,
        pages,
        password,
    })
}

fn read_geometry_blocking(
    bytes: &[u8],
    password: Option<&str>,
) -> Result<Vec<PageGeometry>, EditorError> {
    let pdfium = pdfium()?;
    let document = open_document(pdfium, bytes, password)?;
    Ok(page_geometry(&document))
}

/// Readers accept a header anywhere in the first kilobyte.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// `true` when `%PDF` starts within the first [`HEADER_SEARCH_WINDOW`] bytes.
pub(crate) fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(4).any(|w| w == b"%PDF")
}

/// Parse bytes into a pdfium document, mapping failures onto the editor's
/// error taxonomy.
pub(crate) fn open_document<'a>(
    pdfium: &'a Pdfium,
    bytes: &'a [u8],
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, EditorError> {
    if !has_pdf_header(bytes) {
        let shown = &bytes[..bytes.len().min(4)];
        return Err(EditorError::ParseFailure {
            detail: format!("missing %PDF header (first bytes: {shown:?})"),
        });
    }

    pdfium.load_pdf_from_byte_slice(bytes, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                EditorError::WrongPassword
            } else {
                EditorError::PasswordRequired
            }
        } else {
            EditorError::ParseFailure { detail: err_str }
        }
    })
}

pub(crate) fn page_geometry(document: &PdfDocument<'_>) -> Vec<PageGeometry> {
    document
        .pages()
        .iter()
        .map(|page| PageGeometry {
            width: page.width().value,
            height: page.height().value,
        })
        .collect()
}

/// Extract the text of every page, one line per page.
pub async fn extract_text(document: &LoadedDocument) -> Result<String, EditorError> {
    let bytes = document.shared_bytes();
    let password = document.password.clone();

    tokio::task::spawn_blocking(move || extract_text_blocking(&bytes, password.as_deref()))
        .await
        .map_err(|e| EditorError::Internal(format!("Text task panicked: {}", e)))?
}

fn extract_text_blocking(bytes: &[u8], password: Option<&str>) -> Result<String, EditorError> {
    let pdfium = pdfium()?;
    let document = open_document(pdfium, bytes, password)?;

    let mut full_text = String::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page
            .text()
            .map(|t| t.all())
            .map_err(|e| EditorError::ParseFailure {
                detail: format!("page {}: {:?}", idx + 1, e),
            })?;
        full_text.push_str(text.trim_end());
        full_text.push('\n');
    }

    debug!("Extracted {} chars of text", full_text.len());
    Ok(full_text)
}

/// Text of an analysis input: plain text is used as is, PDFs go through
/// [`extract_text`]. Anything else fails with
/// [`EditorError::UnsupportedFormat`].
pub async fn input_text(input: ResolvedInput, password: Option<&str>) -> Result<String, EditorError> {
    let essence = input.declared_type.split(';').next().unwrap_or("").trim();
    if essence.eq_ignore_ascii_case(TEXT_MIME) {
        debug!("Using {} as plain text", input.source);
        return Ok(String::from_utf8_lossy(&input.bytes).into_owned());
    }
    let document = load_document(input.bytes, &input.declared_type, password).await?;
    extract_text(&document).await
}

// ── Input resolution ─────────────────────────────────────────────────────

/// Bytes read from a local file or URL, with the content type they claim.
#[derive(Debug)]
pub struct ResolvedInput {
    pub bytes: Vec<u8>,
    pub declared_type: String,
    /// Path or URL the bytes came from, for messages.
    pub source: String,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Read a local file or download a URL.
///
/// Local files declare their type through their extension; downloads
/// through their `Content-Type` header (falling back to the URL's
/// extension).
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, EditorError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<ResolvedInput, EditorError> {
    let path = PathBuf::from(path_str);

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => EditorError::PermissionDenied { path: path.clone() },
        _ => EditorError::FileNotFound { path: path.clone() },
    })?;

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(ResolvedInput {
        bytes,
        declared_type: declared_type_for_path(&path).to_string(),
        source: path_str.to_string(),
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, EditorError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| EditorError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            EditorError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            EditorError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(EditorError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let declared_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| declared_type_for_url(url).to_string());

    let bytes = response
        .bytes()
        .await
        .map_err(|e| EditorError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes ({})", bytes.len(), declared_type);

    Ok(ResolvedInput {
        bytes: bytes.to_vec(),
        declared_type,
        source: url.to_string(),
    })
}

/// Content type implied by a file extension.
pub fn declared_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => PDF_MIME,
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("txt") => TEXT_MIME,
        _ => "application/octet-stream",
    }
}

fn declared_type_for_url(url: &str) -> &'static str {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .map(|last| declared_type_for_path(Path::new(&last)))
        .unwrap_or("application/octet-stream")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(bytes: &[u8], declared_type: &str) -> ResolvedInput {
        ResolvedInput {
            bytes: bytes.to_vec(),
            declared_type: declared_type.to_string(),
            source: "notes.txt".to_string(),
        }
    }

    #[tokio::test]
    async fn plain_text_inputs_are_read_directly() {
        let text = input_text(resolved(b"Quarterly notes\nAction: ship", "text/plain"), None)
            .await
            .unwrap();
        assert_eq!(text, "Quarterly notes\nAction: ship");

        let text = input_text(resolved(b"hi", "Text/Plain; charset=utf-8"), None)
            .await
            .unwrap();
        assert_eq!(text, "hi");
    }

    #[tokio::test]
    async fn other_inputs_still_need_pdf() {
        let err = input_text(resolved(b"\x89PNG", "image/png"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::UnsupportedFormat { .. }));
    }

    #[test]
    fn header_may_follow_leading_junk() {
        assert!(has_pdf_header(b"%PDF-1.7"));
        assert!(has_pdf_header(b"\r\n\xEF\xBB\xBF%PDF-1.4"));

        let mut late = vec![b' '; HEADER_SEARCH_WINDOW - 4];
        late.extend_from_slice(b"%PDF-1.7");
        assert!(has_pdf_header(&late));

        let mut too_late = vec![b' '; HEADER_SEARCH_WINDOW];
        too_late.extend_from_slice(b"%PDF-1.7");
        assert!(!has_pdf_header(&too_late));

        assert!(!has_pdf_header(b"GIF89a"));
        assert!(!has_pdf_header(b"%PD"));
    }

    #[test]
    fn declared_type_must_be_pdf() {
        assert!(check_declared_type("application/pdf").is_ok());
        assert!(check_declared_type("Application/PDF").is_ok());
        assert!(check_declared_type("application/pdf; charset=binary").is_ok());
        for bad in ["text/plain", "image/png", "", "application/pdfx"] {
            assert!(
                matches!(
                    check_declared_type(bad),
                    Err(EditorError::UnsupportedFormat { .. })
                ),
                "accepted {bad:?}"
            );
        }
    }

    #[tokio::test]
    async fn wrong_declared_type_fails_before_parsing() {
        let err = load_document(b"%PDF-1.7 whatever".to_vec(), "image/png", None)
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn extension_declares_type() {
        assert_eq!(declared_type_for_path(Path::new("a/b/report.PDF")), PDF_MIME);
        assert_eq!(declared_type_for_path(Path::new("notes.txt")), "text/plain");
        assert_eq!(
            declared_type_for_path(Path::new("no_extension")),
            "application/octet-stream"
        );
        assert_eq!(declared_type_for_url("https://x.org/files/paper.pdf"), PDF_MIME);
        assert_eq!(declared_type_for_url("https://x.org/"), "application/octet-stream");
    }

    #[test]
    fn geometry_lookup_is_one_based() {
        let doc = LoadedDocument::from_parts(
            b"%PDF".to_vec(),
            vec![
                PageGeometry { width: 612.0, height: 792.0 },
                PageGeometry { width: 595.0, height: 842.0 },
            ],
        );
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page_height(1), Some(792.0));
        assert_eq!(doc.page_width(2), Some(595.0));
        assert_eq!(doc.page_height(0), None);
        assert_eq!(doc.page_height(3), None);
        assert!(doc.contains_page(2));
        assert!(!doc.contains_page(3));
    }

    #[tokio::test]
    async fn missing_local_file() {
        let err = resolve_input("/definitely/not/a/real/file.pdf", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::FileNotFound { .. }));
    }
}
