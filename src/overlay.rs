//! Live preview overlay.
//!
//! The overlay turns the annotations on one page into a display list in
//! *screen* space (document coordinates multiplied by the preview scale,
//! top-left origin, no y flip). A host UI can draw the list over its own
//! rendering of the page; [`rasterize`] composites the rectangles and
//! images onto an RGBA canvas for headless previews.
//!
//! Image annotations are decoded once and cached per annotation id, so
//! re-rendering the overlay on every zoom or page change does not re-parse
//! the data URI. The cache entry is dropped when the annotation is removed.

use crate::annotation::{Annotation, AnnotationId, AnnotationKind, FontFamily, Rgb};
use crate::pipeline::encode::decode_data_uri;
use crate::store::AnnotationStore;
use image::{imageops, Rgba, RgbaImage};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// One element of the preview display list, in screen pixels.
#[derive(Debug, Clone)]
pub enum OverlayItem {
    Text {
        id: AnnotationId,
        x: f32,
        y: f32,
        content: String,
        font: FontFamily,
        /// Already multiplied by the preview scale.
        size: f32,
        color: [u8; 3],
    },
    Rect {
        id: AnnotationId,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: [u8; 3],
        opacity: f32,
    },
    Image {
        id: AnnotationId,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        /// `None` when the payload could not be decoded.
        image: Option<Arc<RgbaImage>>,
    },
}

impl OverlayItem {
    pub fn id(&self) -> AnnotationId {
        match self {
            OverlayItem::Text { id, .. }
            | OverlayItem::Rect { id, .. }
            | OverlayItem::Image { id, .. } => *id,
        }
    }
}

/// Display-list builder with a decoded-image cache.
#[derive(Debug, Default)]
pub struct Overlay {
    images: HashMap<AnnotationId, Option<Arc<RgbaImage>>>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Display list for `page` at `scale`, in store order.
    pub fn items(
        &mut self,
        store: &AnnotationStore,
        page: u32,
        scale: f32,
        highlight_opacity: f32,
    ) -> Vec<OverlayItem> {
        store
            .for_page(page)
            .map(|a| self.item(a, scale, highlight_opacity))
            .collect()
    }

    fn item(&mut self, a: &Annotation, scale: f32, highlight_opacity: f32) -> OverlayItem {
        let id = a.id();
        let x = a.x() * scale;
        let y = a.y() * scale;

        match a.kind() {
            AnnotationKind::Text(t) => OverlayItem::Text {
                id,
                x,
                y,
                content: t.content.clone(),
                font: t.font,
                size: t.size as f32 * scale,
                color: Rgb::from_hex_or(&t.color, Rgb::BLACK).to_u8(),
            },
            AnnotationKind::Highlight(h) => OverlayItem::Rect {
                id,
                x,
                y,
                width: h.width() * scale,
                height: h.height() * scale,
                color: Rgb::from_hex_or(&h.color, Rgb::YELLOW).to_u8(),
                opacity: highlight_opacity,
            },
            AnnotationKind::Image(img) => {
                let image = self
                    .images
                    .entry(id)
                    .or_insert_with(|| decode_preview(id, &img.data_uri))
                    .clone();
                OverlayItem::Image {
                    id,
                    x,
                    y,
                    width: img.width() * scale,
                    height: img.height() * scale,
                    image,
                }
            }
        }
    }

    /// Forget the cached image for `id`.
    pub fn invalidate(&mut self, id: AnnotationId) {
        self.images.remove(&id);
    }

    /// Drop cache entries for annotations no longer in `store`.
    pub fn prune(&mut self, store: &AnnotationStore) {
        self.images.retain(|id, _| store.get(*id).is_some());
    }

    /// Number of cached image entries.
    pub fn cached(&self) -> usize {
        self.images.len()
    }
}

fn decode_preview(id: AnnotationId, data_uri: &str) -> Option<Arc<RgbaImage>> {
    let decoded = decode_data_uri(data_uri)
        .and_then(|(_, bytes)| image::load_from_memory(&bytes).map_err(|e| e.to_string()));
    match decoded {
        Ok(img) => {
            debug!("Decoded preview image for {}", id);
            Some(Arc::new(img.to_rgba8()))
        }
        Err(e) => {
            warn!("Preview image for {} unavailable: {}", id, e);
            None
        }
    }
}

/// Composite rectangles and images from `items` onto `canvas`.
///
/// Text items are skipped; [`crate::EditSession::preview`] draws text with
/// pdfium before the overlay is applied. Items are clipped to the canvas, so
/// only the visible part is ever allocated.
pub fn rasterize(items: &[OverlayItem], canvas: &mut RgbaImage) {
    let bounds = (canvas.width(), canvas.height());
    for item in items {
        match item {
            OverlayItem::Rect {
                x,
                y,
                width,
                height,
                color,
                opacity,
                ..
            } => {
                let Some(area) = Visible::clip(*x, *y, *width, *height, bounds) else {
                    continue;
                };
                let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
                let fill = RgbaImage::from_pixel(
                    area.width,
                    area.height,
                    Rgba([color[0], color[1], color[2], alpha]),
                );
                imageops::overlay(canvas, &fill, area.left as i64, area.top as i64);
            }
            OverlayItem::Image {
                x,
                y,
                width,
                height,
                image: Some(image),
                ..
            } => {
                let Some(area) = Visible::clip(*x, *y, *width, *height, bounds) else {
                    continue;
                };
                let (sx, sy, sw, sh) = area.source_window(*x, *y, *width, *height, image);
                let window = imageops::crop_imm(&**image, sx, sy, sw, sh).to_image();
                let scaled =
                    imageops::resize(&window, area.width, area.height, imageops::FilterType::Triangle);
                imageops::overlay(canvas, &scaled, area.left as i64, area.top as i64);
            }
            OverlayItem::Image { image: None, .. } | OverlayItem::Text { .. } => {}
        }
    }
}

/// Part of an item that lands on the canvas, in whole pixels.
#[derive(Debug, PartialEq)]
struct Visible {
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

impl Visible {
    fn clip(x: f32, y: f32, width: f32, height: f32, (cw, ch): (u32, u32)) -> Option<Self> {
        let (x, y) = (x.round() as f64, y.round() as f64);
        let (w, h) = (width.max(0.0).round() as f64, height.max(0.0).round() as f64);
        let left = x.max(0.0);
        let top = y.max(0.0);
        let right = (x + w).min(cw as f64);
        let bottom = (y + h).min(ch as f64);
        if right <= left || bottom <= top {
            return None;
        }
        Some(Self {
            left: left as u32,
            top: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }

    /// Window of `image` that maps onto this visible area.
    fn source_window(
        &self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image: &RgbaImage,
    ) -> (u32, u32, u32, u32) {
        let axis = |start: u32, len: u32, origin: f32, extent: f32, src: u32| -> (u32, u32) {
            let ratio = src as f64 / extent.max(1.0).round() as f64;
            let offset = start as f64 - origin.round() as f64;
            let from = ((offset * ratio).floor().max(0.0) as u32).min(src.saturating_sub(1));
            let to = (((offset + len as f64) * ratio).ceil() as u32).clamp(from + 1, src.max(1));
            (from, to - from)
        };
        let (sx, sw) = axis(self.left, self.width, x, width, image.width());
        let (sy, sh) = axis(self.top, self.height, y, height, image.height());
        (sx, sy, sw, sh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{HighlightMark, ImageMark};
    use crate::pipeline::encode::encode_image;
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;

    fn png_uri() -> String {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        encode_image(&buf)
    }

    #[test]
    fn positions_scale_without_flip() {
        let mut store = AnnotationStore::new();
        store.add(Annotation::highlight(1, 10.0, 20.0, HighlightMark::new(100.0, 20.0, "#ffff00")));
        let items = Overlay::new().items(&store, 1, 1.5, 0.3);
        match &items[0] {
            OverlayItem::Rect { x, y, width, height, opacity, .. } => {
                assert_eq!((*x, *y), (15.0, 30.0));
                assert_eq!((*width, *height), (150.0, 30.0));
                assert_eq!(*opacity, 0.3);
            }
            other => panic!("unexpected item {other:?}"),
        }
    }

    #[test]
    fn only_requested_page_is_listed() {
        let mut store = AnnotationStore::new();
        store.add(Annotation::highlight(1, 0.0, 0.0, HighlightMark::new(1.0, 1.0, "#ffff00")));
        store.add(Annotation::highlight(2, 0.0, 0.0, HighlightMark::new(1.0, 1.0, "#ffff00")));
        let mut overlay = Overlay::new();
        assert_eq!(overlay.items(&store, 2, 1.0, 0.3).len(), 1);
        assert!(overlay.items(&store, 5, 1.0, 0.3).is_empty());
    }

    #[test]
    fn image_decoded_once_and_dropped_on_remove() {
        let mut store = AnnotationStore::new();
        let id = store.add(Annotation::image(1, 0.0, 0.0, ImageMark::new(png_uri(), 10.0, 10.0)));
        let mut overlay = Overlay::new();

        let first = overlay.items(&store, 1, 1.0, 0.3);
        let second = overlay.items(&store, 1, 2.0, 0.3);
        let (a, b) = match (&first[0], &second[0]) {
            (OverlayItem::Image { image: Some(a), .. }, OverlayItem::Image { image: Some(b), .. }) => (a, b),
            other => panic!("unexpected items {other:?}"),
        };
        assert!(Arc::ptr_eq(a, b));
        assert_eq!(overlay.cached(), 1);

        store.remove(id);
        overlay.prune(&store);
        assert_eq!(overlay.cached(), 0);
    }

    #[test]
    fn undecodable_image_is_listed_without_pixels() {
        let mut store = AnnotationStore::new();
        store.add(Annotation::image(1, 0.0, 0.0, ImageMark::new("data:image/png;base64,AAAA", 10.0, 10.0)));
        let items = Overlay::new().items(&store, 1, 1.0, 0.3);
        assert!(matches!(items[0], OverlayItem::Image { image: None, .. }));
    }

    #[test]
    fn rasterize_blends_highlight() {
        let mut store = AnnotationStore::new();
        store.add(Annotation::highlight(1, 0.0, 0.0, HighlightMark::new(4.0, 4.0, "#ff0000")));
        let items = Overlay::new().items(&store, 1, 1.0, 0.5);

        let mut canvas = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
        rasterize(&items, &mut canvas);

        let inside = canvas.get_pixel(1, 1);
        assert_eq!(inside[0], 255);
        assert!(inside[1] > 100 && inside[1] < 160, "got {inside:?}");
        assert_eq!(canvas.get_pixel(6, 6), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn huge_items_are_clipped_to_canvas() {
        let mut store = AnnotationStore::new();
        store.add(Annotation::highlight(1, 2.0, 2.0, HighlightMark::new(1.0e6, 1.0e6, "#ff0000")));
        store.add(Annotation::image(1, 0.0, 0.0, ImageMark::new(png_uri(), 1.0e6, 1.0e6)));
        let items = Overlay::new().items(&store, 1, 1.0, 0.5);

        let mut canvas = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
        rasterize(&items, &mut canvas);

        assert_eq!(canvas.dimensions(), (8, 8));
        assert_eq!(canvas.get_pixel(7, 7), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn off_canvas_items_are_skipped() {
        assert_eq!(Visible::clip(20.0, 0.0, 5.0, 5.0, (8, 8)), None);
        assert_eq!(Visible::clip(-10.0, -10.0, 5.0, 5.0, (8, 8)), None);
        assert_eq!(
            Visible::clip(-2.0, 6.0, 5.0, 5.0, (8, 8)),
            Some(Visible { left: 0, top: 6, width: 3, height: 2 })
        );
    }

    #[test]
    fn partially_visible_image_keeps_its_scale() {
        let mut src = RgbaImage::from_pixel(2, 1, Rgba([255, 0, 0, 255]));
        src.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        let items = vec![OverlayItem::Image {
            id: AnnotationId::new_v4(),
            x: -4.0,
            y: 0.0,
            width: 8.0,
            height: 4.0,
            image: Some(Arc::new(src)),
        }];
        let mut canvas = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
        rasterize(&items, &mut canvas);

        // Only the right (green) half of the image is on the canvas.
        assert_eq!(canvas.get_pixel(1, 1), &Rgba([0, 255, 0, 255]));
        assert_eq!(canvas.get_pixel(5, 1), &Rgba([255, 255, 255, 255]));
    }
}
