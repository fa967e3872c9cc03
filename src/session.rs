//! Editing session: one loaded document, its annotations, tool state and
//! preview overlay, owned by the caller.
//!
//! All mutation takes `&mut self`, so placements are serialised by the
//! borrow checker. Export takes `&self` and can run while the session is
//! shared, but only one export per session may be in flight at a time.

use crate::annotation::{Annotation, AnnotationId, AnnotationKind};
use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::export::{self, ExportOutput, ExportStats};
use crate::overlay::{self, Overlay, OverlayItem};
use crate::pipeline::load::{self, LoadedDocument};
use crate::pipeline::render;
use crate::store::{AnnotationStore, ToolState};
use image::RgbaImage;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// An open document plus everything placed on it so far.
#[derive(Debug)]
pub struct EditSession {
    document: LoadedDocument,
    store: AnnotationStore,
    tools: ToolState,
    overlay: Overlay,
    config: EditorConfig,
    export_in_flight: AtomicBool,
}

/// Releases the in-flight flag when the export finishes or is dropped.
struct ExportGuard<'a>(&'a AtomicBool);

impl<'a> ExportGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, EditorError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| EditorError::ExportInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl EditSession {
    /// Load `bytes` declared as `declared_type` and start a session.
    ///
    /// Non-PDF uploads fail with [`EditorError::UnsupportedFormat`] and no
    /// session is created.
    pub async fn open(
        bytes: Vec<u8>,
        declared_type: &str,
        config: EditorConfig,
    ) -> Result<Self, EditorError> {
        let document = load::load_document(bytes, declared_type, config.password.as_deref()).await?;
        Ok(Self::with_document(document, config))
    }

    /// Resolve a local path or URL, then [`open`](Self::open) it.
    pub async fn open_input(
        input: &str,
        config: EditorConfig,
        timeout_secs: u64,
    ) -> Result<Self, EditorError> {
        let resolved = load::resolve_input(input, timeout_secs).await?;
        info!("Opening {} ({})", resolved.source, resolved.declared_type);
        Self::open(resolved.bytes, &resolved.declared_type, config).await
    }

    /// Start a session over an already loaded document.
    pub fn with_document(document: LoadedDocument, config: EditorConfig) -> Self {
        Self {
            tools: ToolState::new(&config),
            document,
            store: AnnotationStore::new(),
            overlay: Overlay::new(),
            config,
            export_in_flight: AtomicBool::new(false),
        }
    }

    pub fn document(&self) -> &LoadedDocument {
        &self.document
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolState {
        &mut self.tools
    }

    /// Add an annotation after checking its page exists.
    pub fn add(&mut self, annotation: Annotation) -> Result<AnnotationId, EditorError> {
        self.check_page(annotation.page())?;
        Ok(self.store.add(annotation))
    }

    /// Change the page that clicks and uploads target.
    pub fn go_to_page(&mut self, page: u32) -> Result<(), EditorError> {
        self.check_page(page)?;
        self.tools.go_to_page(page);
        Ok(())
    }

    /// Apply a click with the active tool on the current page.
    ///
    /// `Ok(None)` when the tool places nothing for a click.
    pub fn click(&mut self, x: f32, y: f32) -> Result<Option<AnnotationId>, EditorError> {
        match self.tools.click(x, y, &self.config) {
            Some(annotation) => self.add(annotation).map(Some),
            None => {
                debug!("Click at ({}, {}) placed nothing", x, y);
                Ok(None)
            }
        }
    }

    /// Place uploaded image bytes on the current page.
    pub fn place_image(&mut self, bytes: &[u8]) -> Result<AnnotationId, EditorError> {
        let annotation = self.tools.place_image(bytes, &self.config);
        self.add(annotation)
    }

    /// Remove an annotation. Unknown ids are a no-op.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        self.overlay.invalidate(id);
        self.store.remove(id)
    }

    pub fn annotations_on(&self, page: u32) -> impl Iterator<Item = &Annotation> + '_ {
        self.store.for_page(page)
    }

    /// Preview display list for `page` at the configured scale.
    pub fn overlay(&mut self, page: u32) -> Vec<OverlayItem> {
        self.overlay_at(page, self.config.preview_scale)
    }

    pub fn overlay_at(&mut self, page: u32, scale: f32) -> Vec<OverlayItem> {
        self.overlay
            .items(&self.store, page, scale, self.config.highlight_opacity)
    }

    /// Render `page` at the preview scale with every annotation on it.
    ///
    /// Text marks are drawn by pdfium onto a private copy before rendering,
    /// in the faces the export uses; highlights and images are composited
    /// from the overlay cache on top.
    pub async fn preview(&mut self, page: u32) -> Result<RgbaImage, EditorError> {
        self.check_page(page)?;
        let scale = self.config.preview_scale;
        let text_marks: Vec<Annotation> = self
            .store
            .for_page(page)
            .filter(|a| matches!(a.kind(), AnnotationKind::Text(_)))
            .cloned()
            .collect();
        let base = render::render_marked_page(
            self.document.shared_bytes(),
            self.config.password.clone(),
            text_marks,
            page,
            scale,
        )
        .await?;

        let mut canvas = base.to_rgba8();
        let items = self.overlay_at(page, scale);
        overlay::rasterize(&items, &mut canvas);
        Ok(canvas)
    }

    /// Export the document with every annotation drawn.
    ///
    /// Fails with [`EditorError::ExportInProgress`] while another export of
    /// this session is running.
    pub async fn export(&self) -> Result<ExportOutput, EditorError> {
        let _guard = ExportGuard::acquire(&self.export_in_flight)?;
        export::export(
            self.document.shared_bytes(),
            self.store.as_slice(),
            &self.config,
        )
        .await
    }

    /// Export and write atomically to `path`.
    pub async fn export_to_file(&self, path: impl AsRef<Path>) -> Result<ExportStats, EditorError> {
        let output = self.export().await?;
        export::write_atomic(path.as_ref(), &output.bytes).await?;
        Ok(output.stats)
    }

    fn check_page(&self, page: u32) -> Result<(), EditorError> {
        if self.document.contains_page(page) {
            Ok(())
        } else {
            Err(EditorError::PageOutOfRange {
                page,
                total: self.document.page_count(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::HighlightMark;
    use crate::pipeline::load::PageGeometry;
    use crate::store::Tool;

    const LETTER: PageGeometry = PageGeometry {
        width: 612.0,
        height: 792.0,
    };

    fn session(pages: usize) -> EditSession {
        let doc = LoadedDocument::from_parts(b"%PDF-1.7".to_vec(), vec![LETTER; pages]);
        EditSession::with_document(doc, EditorConfig::default())
    }

    #[test]
    fn out_of_range_page_is_rejected_at_placement() {
        let mut s = session(2);
        let err = s
            .add(Annotation::highlight(3, 0.0, 0.0, HighlightMark::new(1.0, 1.0, "#ffff00")))
            .unwrap_err();
        assert!(matches!(err, EditorError::PageOutOfRange { page: 3, total: 2 }));
        assert!(s.store().is_empty());
        assert!(s.go_to_page(0).is_err());
    }

    #[test]
    fn click_goes_to_current_page() {
        let mut s = session(2);
        s.go_to_page(2).unwrap();
        s.tools_mut().select(Some(Tool::Highlight));
        let id = s.click(10.0, 20.0).unwrap().unwrap();
        let a = s.store().get(id).unwrap();
        assert_eq!(a.page(), 2);
        assert!(matches!(a.kind(), AnnotationKind::Highlight(_)));
        assert_eq!(s.annotations_on(1).count(), 0);
    }

    #[test]
    fn click_without_tool_places_nothing() {
        let mut s = session(1);
        assert_eq!(s.click(1.0, 1.0).unwrap(), None);
        assert!(s.store().is_empty());
    }

    #[test]
    fn remove_unknown_id_is_noop() {
        let mut s = session(1);
        s.tools_mut().select(Some(Tool::Highlight));
        s.click(0.0, 0.0).unwrap();
        assert!(s.remove(AnnotationId::new_v4()).is_none());
        assert_eq!(s.store().len(), 1);
    }

    #[test]
    fn overlay_uses_preview_scale() {
        let mut s = session(1);
        s.tools_mut().select(Some(Tool::Highlight));
        s.click(10.0, 10.0).unwrap();
        match &s.overlay(1)[0] {
            OverlayItem::Rect { x, width, .. } => {
                assert_eq!(*x, 15.0);
                assert_eq!(*width, 150.0);
            }
            other => panic!("unexpected item {other:?}"),
        }
    }

    #[test]
    fn second_export_guard_is_refused() {
        let flag = AtomicBool::new(false);
        let first = ExportGuard::acquire(&flag).unwrap();
        assert!(matches!(
            ExportGuard::acquire(&flag),
            Err(EditorError::ExportInProgress)
        ));
        drop(first);
        assert!(ExportGuard::acquire(&flag).is_ok());
    }

    #[tokio::test]
    async fn non_pdf_upload_creates_no_session() {
        let err = EditSession::open(b"hello".to_vec(), "text/plain", EditorConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::UnsupportedFormat { .. }));
    }
}
