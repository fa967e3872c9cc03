//! Page rasterisation via pdfium, for preview images.
//!
//! [`render_marked_page`] draws text annotations onto an in-memory copy
//! first, so previews show text in the same faces the export uses.
//!
//! Rendering runs on a `spawn_blocking` thread: pdfium is a blocking C++
//! library and a large page at 2.5× zoom takes long enough to stall a Tokio
//! worker.

use crate::annotation::Annotation;
use crate::error::EditorError;
use crate::pipeline::bind::pdfium;
use crate::pipeline::draw;
use crate::pipeline::load::open_document;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::sync::Arc;
use tracing::{debug, warn};

/// Rasterise one 1-based page of `bytes` at `scale` (1.0 = 1 px per point),
/// with `marks` drawn onto it first.
///
/// The marks go onto a private copy; nothing is saved. Pass no marks to
/// render the page as it is.
pub async fn render_marked_page(
    bytes: Arc<[u8]>,
    password: Option<String>,
    marks: Vec<Annotation>,
    page: u32,
    scale: f32,
) -> Result<DynamicImage, EditorError> {
    tokio::task::spawn_blocking(move || {
        render_marked_page_blocking(&bytes, password.as_deref(), &marks, page, scale)
    })
    .await
    .map_err(|e| EditorError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of [`render_marked_page`].
pub fn render_marked_page_blocking(
    bytes: &[u8],
    password: Option<&str>,
    marks: &[Annotation],
    page: u32,
    scale: f32,
) -> Result<DynamicImage, EditorError> {
    let pdfium = pdfium()?;
    let mut document = open_document(pdfium, bytes, password)?;

    if !marks.is_empty() {
        let (drawn, failures) = draw::draw_annotations(&mut document, marks, 1.0, None);
        for failure in &failures {
            warn!("Preview: {}", failure);
        }
        debug!("Preview page {}: {} marks drawn", page, drawn);
    }

    let pages = document.pages();
    let total = pages.len() as u32;
    if page == 0 || page > total {
        return Err(EditorError::PageOutOfRange { page, total });
    }

    let pdf_page = pages
        .get((page - 1) as u16)
        .map_err(|e| EditorError::Internal(format!("page {}: {:?}", page, e)))?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let bitmap = pdf_page
        .render_with_config(&render_config)
        .map_err(|e| EditorError::Internal(format!("render page {}: {:?}", page, e)))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} at {:.2}× → {}x{} px",
        page,
        scale,
        image.width(),
        image.height()
    );
    Ok(image)
}
