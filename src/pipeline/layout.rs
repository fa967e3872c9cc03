//! Annotation → draw plan: all coordinate math for export, no pdfium.
//!
//! Annotations are stored with a top-left origin (y grows down the page).
//! PDF content streams use a bottom-left origin, so each position is flipped
//! against the page height `H`:
//!
//! | kind      | anchor drawn at        |
//! |-----------|------------------------|
//! | text      | baseline `(x, H − y)`  |
//! | highlight | `(x, H − y − height)`  |
//! | image     | `(x, H − y − height)`  |
//!
//! Text is anchored at its baseline, so the glyphs sit *above* the click
//! point in the exported file; rectangles and images hang *below* it.

use crate::annotation::{Annotation, AnnotationId, AnnotationKind, FontFamily, Rgb};
use crate::error::AnnotationError;
use crate::pipeline::encode::{decode_data_uri, EmbedFormat};
use crate::pipeline::load::PageGeometry;
use std::collections::BTreeMap;
use tracing::warn;

/// A single draw operation in PDF document space (bottom-left origin).
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        /// Baseline.
        y: f32,
        content: String,
        font: FontFamily,
        size: f32,
        color: Rgb,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
        opacity: f32,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        format: EmbedFormat,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedOp {
    pub id: AnnotationId,
    pub op: DrawOp,
}

/// Every operation destined for one page, in store order.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlan {
    /// 1-based.
    pub page: u32,
    pub ops: Vec<PlannedOp>,
}

/// An annotation that was dropped while planning.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedOp {
    pub page: u32,
    pub error: AnnotationError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositionPlan {
    /// Ascending by page number.
    pub pages: Vec<PagePlan>,
    pub skipped: Vec<SkippedOp>,
}

impl CompositionPlan {
    pub fn op_count(&self) -> usize {
        self.pages.iter().map(|p| p.ops.len()).sum()
    }
}

/// Build the draw plan for `annotations` against a document with the given
/// page geometry.
///
/// Annotations on pages the document lacks, and images whose data URI is
/// malformed or names a format other than PNG/JPEG, are moved to
/// [`CompositionPlan::skipped`] instead of failing the plan.
pub fn plan<'a>(
    annotations: impl IntoIterator<Item = &'a Annotation>,
    pages: &[PageGeometry],
    highlight_opacity: f32,
) -> CompositionPlan {
    let total = pages.len() as u32;
    let mut by_page: BTreeMap<u32, Vec<PlannedOp>> = BTreeMap::new();
    let mut skipped = Vec::new();

    for annotation in annotations {
        let page = annotation.page();
        let id = annotation.id();

        let geometry = match page.checked_sub(1).and_then(|i| pages.get(i as usize)) {
            Some(g) => g,
            None => {
                warn!("Skipping annotation {}: page {} of {}", id, page, total);
                skipped.push(SkippedOp {
                    page,
                    error: AnnotationError::PageOutOfRange { id, page, total },
                });
                continue;
            }
        };

        match plan_one(annotation, geometry.height, highlight_opacity) {
            Ok(op) => by_page.entry(page).or_default().push(PlannedOp { id, op }),
            Err(error) => {
                warn!("Skipping annotation: {}", error);
                skipped.push(SkippedOp { page, error });
            }
        }
    }

    CompositionPlan {
        pages: by_page
            .into_iter()
            .map(|(page, ops)| PagePlan { page, ops })
            .collect(),
        skipped,
    }
}

fn plan_one(
    annotation: &Annotation,
    page_height: f32,
    highlight_opacity: f32,
) -> Result<DrawOp, AnnotationError> {
    let x = annotation.x();
    let y = annotation.y();

    match annotation.kind() {
        AnnotationKind::Text(t) => Ok(DrawOp::Text {
            x,
            y: page_height - y,
            content: t.content.clone(),
            font: t.font,
            size: t.size as f32,
            color: Rgb::from_hex_or(&t.color, Rgb::BLACK),
        }),
        AnnotationKind::Highlight(h) => Ok(DrawOp::Rect {
            x,
            y: page_height - y - h.height(),
            width: h.width(),
            height: h.height(),
            color: Rgb::from_hex_or(&h.color, Rgb::YELLOW),
            opacity: highlight_opacity,
        }),
        AnnotationKind::Image(img) => {
            let id = annotation.id();
            let (mime, bytes) = decode_data_uri(&img.data_uri)
                .map_err(|detail| AnnotationError::InvalidImageData { id, detail })?;
            let format = EmbedFormat::from_mime(&mime)
                .ok_or(AnnotationError::UnsupportedImageFormat { id, mime })?;
            Ok(DrawOp::Image {
                x,
                y: page_height - y - img.height(),
                width: img.width(),
                height: img.height(),
                format,
                bytes,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{HighlightMark, ImageMark, TextMark};

    const LETTER: PageGeometry = PageGeometry {
        width: 612.0,
        height: 792.0,
    };

    fn text(page: u32, x: f32, y: f32, color: &str) -> Annotation {
        Annotation::text(
            page,
            x,
            y,
            TextMark {
                content: "Hello".into(),
                font: FontFamily::Helvetica,
                size: 16,
                color: color.into(),
            },
        )
    }

    fn single_op(plan: &CompositionPlan) -> &DrawOp {
        assert_eq!(plan.op_count(), 1, "plan: {plan:?}");
        &plan.pages[0].ops[0].op
    }

    #[test]
    fn text_baseline_is_flipped() {
        let a = text(1, 50.0, 100.0, "#000000");
        let p = plan([&a], &[LETTER], 0.3);
        match single_op(&p) {
            DrawOp::Text { x, y, size, color, .. } => {
                assert_eq!((*x, *y), (50.0, 692.0));
                assert_eq!(*size, 16.0);
                assert_eq!(*color, Rgb::BLACK);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn highlight_hangs_below_click() {
        let a = Annotation::highlight(1, 10.0, 20.0, HighlightMark::new(100.0, 20.0, "#ff0000"));
        let p = plan([&a], &[LETTER], 0.3);
        match single_op(&p) {
            DrawOp::Rect { x, y, width, height, color, opacity } => {
                assert_eq!((*x, *y), (10.0, 752.0));
                assert_eq!((*width, *height), (100.0, 20.0));
                assert_eq!(color.to_u8(), [255, 0, 0]);
                assert_eq!(*opacity, 0.3);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn malformed_colours_fall_back() {
        let t = text(1, 0.0, 0.0, "notacolor");
        let h = Annotation::highlight(1, 0.0, 0.0, HighlightMark::new(1.0, 1.0, "notacolor"));
        let p = plan([&t, &h], &[LETTER], 0.3);
        let ops = &p.pages[0].ops;
        assert!(matches!(ops[0].op, DrawOp::Text { color, .. } if color == Rgb::BLACK));
        assert!(matches!(ops[1].op, DrawOp::Rect { color, .. } if color == Rgb::YELLOW));
    }

    #[test]
    fn pages_ascend_and_keep_store_order() {
        let a = text(2, 1.0, 1.0, "#000000");
        let b = text(1, 2.0, 2.0, "#000000");
        let c = text(2, 3.0, 3.0, "#000000");
        let p = plan([&a, &b, &c], &[LETTER, LETTER], 0.3);

        let pages: Vec<_> = p.pages.iter().map(|pp| pp.page).collect();
        assert_eq!(pages, vec![1, 2]);
        let page2: Vec<_> = p.pages[1].ops.iter().map(|o| o.id).collect();
        assert_eq!(page2, vec![a.id(), c.id()]);
    }

    #[test]
    fn per_page_height_is_used() {
        let a4 = PageGeometry { width: 595.0, height: 842.0 };
        let a = text(2, 0.0, 42.0, "#000000");
        let p = plan([&a], &[LETTER, a4], 0.3);
        assert!(matches!(single_op(&p), DrawOp::Text { y, .. } if *y == 800.0));
    }

    #[test]
    fn missing_page_is_skipped() {
        let a = text(3, 0.0, 0.0, "#000000");
        let p = plan([&a], &[LETTER], 0.3);
        assert_eq!(p.op_count(), 0);
        assert_eq!(
            p.skipped[0].error,
            AnnotationError::PageOutOfRange { id: a.id(), page: 3, total: 1 }
        );

        let zero = text(0, 0.0, 0.0, "#000000");
        assert_eq!(plan([&zero], &[LETTER], 0.3).skipped.len(), 1);
    }

    #[test]
    fn unsupported_and_invalid_images_are_skipped() {
        let gif = Annotation::image(1, 0.0, 0.0, ImageMark::new("data:image/gif;base64,R0lGODlh", 10.0, 10.0));
        let junk = Annotation::image(1, 0.0, 0.0, ImageMark::new("not a data uri", 10.0, 10.0));
        let ok = text(1, 0.0, 0.0, "#000000");
        let p = plan([&gif, &junk, &ok], &[LETTER], 0.3);

        assert_eq!(p.op_count(), 1);
        assert!(matches!(
            &p.skipped[0].error,
            AnnotationError::UnsupportedImageFormat { mime, .. } if mime == "image/gif"
        ));
        assert!(matches!(p.skipped[1].error, AnnotationError::InvalidImageData { .. }));
    }

    #[test]
    fn image_position_and_format() {
        let a = Annotation::image(1, 100.0, 100.0, ImageMark::new("data:image/png;base64,AAAA", 150.0, 150.0));
        let p = plan([&a], &[LETTER], 0.3);
        match single_op(&p) {
            DrawOp::Image { x, y, width, height, format, bytes } => {
                assert_eq!((*x, *y), (100.0, 542.0));
                assert_eq!((*width, *height), (150.0, 150.0));
                assert_eq!(*format, EmbedFormat::Png);
                assert_eq!(bytes, &vec![0u8, 0, 0]);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn two_page_scenario() {
        let hello = text(1, 50.0, 100.0, "#000000");
        let mark = Annotation::highlight(2, 10.0, 20.0, HighlightMark::new(100.0, 20.0, "#ffff00"));
        let p = plan([&hello, &mark], &[LETTER, LETTER], 0.3);

        assert_eq!(p.pages.len(), 2);
        assert!(p.skipped.is_empty());
        assert!(matches!(p.pages[0].ops[0].op, DrawOp::Text { y, .. } if y == 692.0));
        assert!(matches!(p.pages[1].ops[0].op, DrawOp::Rect { y, .. } if y == 752.0));
    }
}
