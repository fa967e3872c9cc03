//! Annotation store and the placement policy that feeds it.
//!
//! [`AnnotationStore`] is an insertion-ordered list; ordering matters because
//! the compositor draws annotations on a page in the order they were added,
//! so later marks paint over earlier ones.
//!
//! [`ToolState`] turns pointer clicks and image uploads into annotations
//! using the active tool and the shared text/colour settings.

use crate::annotation::{
    Annotation, AnnotationId, FontFamily, HighlightMark, ImageMark, TextMark,
};
use crate::config::EditorConfig;
use crate::pipeline::encode::encode_image;
use std::collections::BTreeSet;
use tracing::debug;

/// Ordered collection of annotations for one editing session.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    items: Vec<Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an annotation under a freshly generated id and return that id.
    ///
    /// Any id the annotation already carried is replaced, so ids are unique
    /// within the store even when the same value is added twice.
    pub fn add(&mut self, mut annotation: Annotation) -> AnnotationId {
        let id = AnnotationId::new_v4();
        annotation.assign_id(id);
        debug!(
            "Added {} annotation {} on page {}",
            annotation.kind().name(),
            id,
            annotation.page()
        );
        self.items.push(annotation);
        id
    }

    /// Remove by id. Unknown ids are a no-op and return `None`.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let pos = self.items.iter().position(|a| a.id() == id)?;
        Some(self.items.remove(pos))
    }

    /// Annotations targeting `page`, in insertion order.
    pub fn for_page(&self, page: u32) -> impl Iterator<Item = &Annotation> + '_ {
        self.items.iter().filter(move |a| a.page() == page)
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.items.iter().find(|a| a.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> + '_ {
        self.items.iter()
    }

    /// Distinct pages that carry at least one annotation, ascending.
    pub fn pages(&self) -> Vec<u32> {
        self.items
            .iter()
            .map(Annotation::page)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn as_slice(&self) -> &[Annotation] {
        &self.items
    }
}

// ── Placement policy ─────────────────────────────────────────────────────

/// The editing tool a click is interpreted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Text,
    Image,
    Highlight,
}

/// Current tool selection plus the settings new marks are created with.
#[derive(Debug, Clone)]
pub struct ToolState {
    active: Option<Tool>,
    pending_text: String,
    font: FontFamily,
    font_size: u32,
    color: String,
    current_page: u32,
}

impl ToolState {
    /// Start with no tool selected on page 1, taking font size and colour
    /// from `config`.
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            active: None,
            pending_text: String::new(),
            font: FontFamily::default(),
            font_size: config.font_size.clamp(8, 72),
            color: config.color.clone(),
            current_page: 1,
        }
    }

    pub fn select(&mut self, tool: Option<Tool>) {
        self.active = tool;
    }

    pub fn active(&self) -> Option<Tool> {
        self.active
    }

    pub fn set_pending_text(&mut self, text: impl Into<String>) {
        self.pending_text = text.into();
    }

    pub fn pending_text(&self) -> &str {
        &self.pending_text
    }

    pub fn set_font(&mut self, font: FontFamily) {
        self.font = font;
    }

    pub fn font(&self) -> FontFamily {
        self.font
    }

    /// Clamped to 8..=72.
    pub fn set_font_size(&mut self, size: u32) {
        self.font_size = size.clamp(8, 72);
    }

    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    /// Shared by the text and highlight tools.
    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    /// Page that clicks and uploads target. Values below 1 become 1.
    pub fn go_to_page(&mut self, page: u32) {
        self.current_page = page.max(1);
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Interpret a click at unscaled page coordinates.
    ///
    /// Returns the annotation to add, or `None` when the click places
    /// nothing: no tool, the image tool (uploads place images), or the text
    /// tool without pending text. Placing text consumes the pending text.
    pub fn click(&mut self, x: f32, y: f32, config: &EditorConfig) -> Option<Annotation> {
        match self.active? {
            Tool::Text => {
                if self.pending_text.trim().is_empty() {
                    return None;
                }
                let content = std::mem::take(&mut self.pending_text);
                Some(Annotation::text(
                    self.current_page,
                    x,
                    y,
                    TextMark {
                        content,
                        font: self.font,
                        size: self.font_size,
                        color: self.color.clone(),
                    },
                ))
            }
            Tool::Highlight => Some(Annotation::highlight(
                self.current_page,
                x,
                y,
                HighlightMark::new(
                    config.highlight_width,
                    config.highlight_height,
                    self.color.clone(),
                ),
            )),
            Tool::Image => None,
        }
    }

    /// Turn uploaded image bytes into an image annotation at the configured
    /// origin and size on the current page.
    pub fn place_image(&self, bytes: &[u8], config: &EditorConfig) -> Annotation {
        let (x, y) = config.image_origin;
        let (w, h) = config.image_size;
        Annotation::image(self.current_page, x, y, ImageMark::new(encode_image(bytes), w, h))
    }
}
