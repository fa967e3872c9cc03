//! Export compositor entry points.
//!
//! [`export`] is a pure function of its inputs: it parses a fresh copy of
//! the original bytes, draws the annotations, and returns the new document.
//! Nothing it does is visible to the caller's bytes or store, so concurrent
//! exports of the same document are safe. Per-session exclusivity is
//! enforced one level up, in [`crate::session::EditSession::export`].

use crate::annotation::Annotation;
use crate::config::EditorConfig;
use crate::error::{AnnotationError, EditorError};
use crate::pipeline::draw;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Counters and per-annotation failures for one export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportStats {
    /// Annotations handed to the compositor.
    pub total: usize,
    pub drawn: usize,
    pub skipped: usize,
    /// One entry per skipped annotation.
    pub failures: Vec<AnnotationError>,
    pub duration_ms: u64,
}

/// The exported document.
#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub bytes: Vec<u8>,
    /// Suggested name for the file (`edited-document.pdf` unless configured).
    pub filename: String,
    pub stats: ExportStats,
}

/// Draw `annotations` onto a fresh copy of `original`.
///
/// # Errors
/// Fatal only when the copy cannot be parsed ([`EditorError::ParseFailure`]),
/// pdfium cannot be bound, or the result cannot be serialised. Annotations
/// that cannot be drawn are reported in [`ExportStats::failures`].
///
/// # Example
/// ```rust,no_run
/// use pdf_annotator::{export, Annotation, EditorConfig, HighlightMark};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let original = std::fs::read("document.pdf")?;
/// let marks = vec![Annotation::highlight(1, 10.0, 20.0, HighlightMark::new(100.0, 20.0, "#ffff00"))];
/// let output = export(original, &marks, &EditorConfig::default()).await?;
/// std::fs::write(&output.filename, &output.bytes)?;
/// # Ok(())
/// # }
/// ```
pub async fn export(
    original: impl Into<Arc<[u8]>>,
    annotations: &[Annotation],
    config: &EditorConfig,
) -> Result<ExportOutput, EditorError> {
    let start = Instant::now();
    let original: Arc<[u8]> = original.into();
    let annotations = annotations.to_vec();
    let total = annotations.len();
    let password = config.password.clone();
    let opacity = config.highlight_opacity;
    let progress = config.progress_callback.clone();

    info!("Exporting {} annotations", total);

    let outcome = tokio::task::spawn_blocking(move || {
        draw::compose_blocking(
            &original,
            password.as_deref(),
            &annotations,
            opacity,
            progress.as_ref(),
        )
    })
    .await
    .map_err(|e| EditorError::Internal(format!("Export task panicked: {}", e)))??;

    let stats = ExportStats {
        total,
        drawn: outcome.drawn,
        skipped: outcome.failures.len(),
        failures: outcome.failures,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Export complete: {}/{} drawn, {}ms",
        stats.drawn, stats.total, stats.duration_ms
    );

    Ok(ExportOutput {
        bytes: outcome.bytes,
        filename: config.output_filename.clone(),
        stats,
    })
}

/// Export and write the result to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn export_to_file(
    original: impl Into<Arc<[u8]>>,
    annotations: &[Annotation],
    output_path: impl AsRef<Path>,
    config: &EditorConfig,
) -> Result<ExportStats, EditorError> {
    let output = export(original, annotations, config).await?;
    write_atomic(output_path.as_ref(), &output.bytes).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`export`].
///
/// Creates a temporary tokio runtime internally.
pub fn export_sync(
    original: impl Into<Arc<[u8]>>,
    annotations: &[Annotation],
    config: &EditorConfig,
) -> Result<ExportOutput, EditorError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| EditorError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(export(original, annotations, config))
}

pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), EditorError> {
    let write_err = |e| EditorError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_serialise_with_failures() {
        let stats = ExportStats {
            total: 2,
            drawn: 1,
            skipped: 1,
            failures: vec![AnnotationError::UnsupportedImageFormat {
                id: uuid::Uuid::nil(),
                mime: "image/gif".into(),
            }],
            duration_ms: 5,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["drawn"], 1);
        assert_eq!(json["failures"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_pdf_bytes_fail_to_parse() {
        let err = export(b"plain text".to_vec(), &[], &EditorConfig::default())
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                EditorError::ParseFailure { .. } | EditorError::PdfiumBindingFailed(_)
            ),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn atomic_write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.pdf");
        write_atomic(&path, b"%PDF-1.7").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7");
        assert!(!path.with_extension("pdf.tmp").exists());
    }
}
