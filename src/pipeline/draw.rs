//! Apply a draw plan to a fresh pdfium document and serialise it.
//!
//! Everything here is blocking and must run inside `spawn_blocking`
//! (see [`crate::export`]). Each call parses its own copy of the original
//! bytes; the caller's bytes are never touched.
//!
//! Failures are isolated per annotation: one undecodable image or one
//! refused page object becomes an [`AnnotationError`] and the rest of the
//! plan is still drawn.

use crate::annotation::{Annotation, AnnotationId, FontFamily, Rgb};
use crate::error::{AnnotationError, EditorError};
use crate::pipeline::bind::pdfium;
use crate::pipeline::encode::decode_image;
use crate::pipeline::layout::{self, DrawOp};
use crate::pipeline::load::{open_document, page_geometry};
use crate::progress::ProgressCallback;
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

/// Result of drawing a plan onto a fresh copy.
#[derive(Debug)]
pub(crate) struct DrawOutcome {
    pub bytes: Vec<u8>,
    pub drawn: usize,
    pub failures: Vec<AnnotationError>,
}

/// Standard-14 font tokens, fetched before any page is borrowed.
struct FontSet {
    helvetica: PdfFontToken,
    courier: PdfFontToken,
    times: PdfFontToken,
}

impl FontSet {
    fn load(document: &mut PdfDocument<'_>) -> Self {
        let fonts = document.fonts_mut();
        Self {
            helvetica: fonts.helvetica(),
            courier: fonts.courier(),
            times: fonts.times_roman(),
        }
    }

    fn token(&self, family: FontFamily) -> PdfFontToken {
        match family {
            FontFamily::Helvetica => self.helvetica,
            FontFamily::Courier => self.courier,
            FontFamily::Times => self.times,
        }
    }
}

/// Parse `original`, draw every annotation onto its page, return the new
/// document's bytes.
///
/// Fails only when the copy cannot be parsed or the result cannot be
/// serialised.
pub(crate) fn compose_blocking(
    original: &[u8],
    password: Option<&str>,
    annotations: &[Annotation],
    highlight_opacity: f32,
    progress: Option<&ProgressCallback>,
) -> Result<DrawOutcome, EditorError> {
    let pdfium = pdfium()?;
    let mut document = open_document(pdfium, original, password)?;

    if let Some(cb) = progress {
        cb.on_export_start(annotations.len());
    }

    let (drawn, failures) = draw_annotations(&mut document, annotations, highlight_opacity, progress);

    let bytes = document
        .save_to_bytes()
        .map_err(|e| EditorError::Internal(format!("Failed to serialise PDF: {:?}", e)))?;

    info!(
        "Composited {} annotations ({} skipped) → {} bytes",
        drawn,
        failures.len(),
        bytes.len()
    );

    if let Some(cb) = progress {
        cb.on_export_complete(drawn, failures.len());
    }

    Ok(DrawOutcome {
        bytes,
        drawn,
        failures,
    })
}

/// Draw `annotations` onto an open document without saving it.
///
/// Returns the number drawn and one error per annotation that was not. Each
/// touched page has its content stream regenerated once all of its objects
/// are in place, so colours set after an object is added are kept.
pub(crate) fn draw_annotations(
    document: &mut PdfDocument<'_>,
    annotations: &[Annotation],
    highlight_opacity: f32,
    progress: Option<&ProgressCallback>,
) -> (usize, Vec<AnnotationError>) {
    let geometry = page_geometry(document);
    let fonts = FontSet::load(document);
    let plan = layout::plan(annotations, &geometry, highlight_opacity);

    let total = annotations.len();
    // Shared by drawn and skipped annotations so `index` runs 0..total.
    let mut index = 0usize;
    let mut failures = Vec::new();

    for skipped in plan.skipped {
        if let Some(cb) = progress {
            cb.on_annotation_skipped(skipped.page, &skipped.error.to_string());
        }
        failures.push(skipped.error);
        index += 1;
    }

    let mut drawn = 0usize;

    for page_plan in &plan.pages {
        let page_no = page_plan.page;
        let mut page = match document.pages().get((page_no - 1) as u16) {
            Ok(p) => p,
            Err(e) => {
                let detail = format!("{:?}", e);
                warn!("Page {} unavailable: {}", page_no, detail);
                for planned in &page_plan.ops {
                    let error = AnnotationError::DrawFailed {
                        id: planned.id,
                        page: page_no,
                        detail: detail.clone(),
                    };
                    if let Some(cb) = progress {
                        cb.on_annotation_skipped(page_no, &error.to_string());
                    }
                    failures.push(error);
                    index += 1;
                }
                continue;
            }
        };

        let mut placed = Vec::with_capacity(page_plan.ops.len());
        for planned in &page_plan.ops {
            match apply_op(&mut page, page_no, planned.id, &planned.op, &fonts) {
                Ok(()) => {
                    if let Some(cb) = progress {
                        cb.on_annotation_drawn(page_no, index, total);
                    }
                    placed.push(planned.id);
                }
                Err(error) => {
                    warn!("{}", error);
                    if let Some(cb) = progress {
                        cb.on_annotation_skipped(page_no, &error.to_string());
                    }
                    failures.push(error);
                }
            }
            index += 1;
        }

        if let Err(e) = page.regenerate_content() {
            let detail = format!("content regeneration failed: {:?}", e);
            warn!("Page {}: {}", page_no, detail);
            failures.extend(placed.drain(..).map(|id| AnnotationError::DrawFailed {
                id,
                page: page_no,
                detail: detail.clone(),
            }));
        }
        drawn += placed.len();
        debug!("Page {}: {} ops applied", page_no, placed.len());
    }

    (drawn, failures)
}

fn apply_op(
    page: &mut PdfPage<'_>,
    page_no: u32,
    id: AnnotationId,
    op: &DrawOp,
    fonts: &FontSet,
) -> Result<(), AnnotationError> {
    let draw_failed = |e: PdfiumError| AnnotationError::DrawFailed {
        id,
        page: page_no,
        detail: format!("{:?}", e),
    };

    match op {
        DrawOp::Text {
            x,
            y,
            content,
            font,
            size,
            color,
        } => {
            let mut object = page
                .objects_mut()
                .create_text_object(
                    PdfPoints::new(*x),
                    PdfPoints::new(*y),
                    content,
                    fonts.token(*font),
                    PdfPoints::new(*size),
                )
                .map_err(draw_failed)?;
            object
                .set_fill_color(pdf_color(*color, 1.0))
                .map_err(draw_failed)?;
        }
        DrawOp::Rect {
            x,
            y,
            width,
            height,
            color,
            opacity,
        } => {
            let rect = PdfRect::new_from_values(*y, *x, *y + *height, *x + *width);
            page.objects_mut()
                .create_path_object_rect(rect, None, None, Some(pdf_color(*color, *opacity)))
                .map_err(draw_failed)?;
        }
        DrawOp::Image {
            x,
            y,
            width,
            height,
            format,
            bytes,
        } => {
            let image = decode_image(bytes, *format).map_err(|e| {
                AnnotationError::ImageDecodeFailed {
                    id,
                    detail: e.to_string(),
                }
            })?;
            page.objects_mut()
                .create_image_object(
                    PdfPoints::new(*x),
                    PdfPoints::new(*y),
                    &image,
                    Some(PdfPoints::new(*width)),
                    Some(PdfPoints::new(*height)),
                )
                .map_err(draw_failed)?;
        }
    }
    Ok(())
}

fn pdf_color(color: Rgb, opacity: f32) -> PdfColor {
    let [r, g, b] = color.to_u8();
    let a = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    PdfColor::new(r, g, b, a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlight_alpha_from_opacity() {
        let c = pdf_color(Rgb::YELLOW, 0.3);
        assert_eq!((c.red(), c.green(), c.blue(), c.alpha()), (255, 255, 0, 77));
        let opaque = pdf_color(Rgb::BLACK, 1.0);
        assert_eq!(opaque.alpha(), 255);
    }
}
