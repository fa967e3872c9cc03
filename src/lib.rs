//! # pdf-annotator
//!
//! Place text, image and highlight annotations on the pages of a PDF,
//! preview them, and export a new PDF with every mark drawn in.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Load     declared type must be application/pdf; parse via pdfium
//!  ├─ 2. Place    tools turn clicks/uploads into annotations in the store
//!  ├─ 3. Preview  overlay display list at the preview scale
//!  └─ 4. Export   fresh copy + draw plan → edited-document.pdf
//! ```
//!
//! The original bytes are never modified. Each export re-parses them, so a
//! failed export leaves the session exactly as it was.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_annotator::{EditSession, EditorConfig, Tool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bytes = std::fs::read("document.pdf")?;
//!     let mut session = EditSession::open(bytes, "application/pdf", EditorConfig::default()).await?;
//!
//!     session.tools_mut().select(Some(Tool::Text));
//!     session.tools_mut().set_pending_text("Reviewed");
//!     session.click(50.0, 100.0)?;
//!
//!     session.tools_mut().select(Some(Tool::Highlight));
//!     session.click(10.0, 20.0)?;
//!
//!     let output = session.export().await?;
//!     std::fs::write(&output.filename, &output.bytes)?;
//!     eprintln!("{} drawn, {} skipped", output.stats.drawn, output.stats.skipped);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfannot` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-annotator = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! Loading, exporting and rendering need the pdfium shared library at run
//! time. It is looked up via `PDFIUM_LIB_PATH`, then the working directory,
//! then the system library path. See [`pipeline::bind`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod annotation;
pub mod config;
pub mod error;
pub mod export;
pub mod overlay;
pub mod pipeline;
pub mod progress;
pub mod script;
pub mod services;
pub mod session;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use annotation::{
    Annotation, AnnotationId, AnnotationKind, FontFamily, HighlightMark, ImageMark, Rgb, TextMark,
};
pub use config::{EditorConfig, EditorConfigBuilder, ServiceConfig, DEFAULT_OUTPUT_FILENAME};
pub use error::{AnnotationError, EditorError};
pub use export::{export, export_sync, export_to_file, ExportOutput, ExportStats};
pub use overlay::{Overlay, OverlayItem};
pub use pipeline::bind::pdfium_available;
pub use pipeline::load::{
    extract_text, input_text, load_document, resolve_input, LoadedDocument, PageGeometry,
};
pub use progress::{ExportProgressCallback, NoopProgressCallback, ProgressCallback};
pub use script::{Action, EditScript};
pub use services::{AnalysisMode, ServiceClient, VideoResult};
pub use session::EditSession;
pub use store::{AnnotationStore, Tool, ToolState};
