//! Annotation data model.
//!
//! An [`Annotation`] is one user-placed mark on one page. The variant payload
//! lives in the closed [`AnnotationKind`] enum so every consumer (overlay,
//! layout, CLI listing) matches exhaustively and never has to guess which
//! optional fields a given kind carries.
//!
//! Positions are unscaled document-space units with a **top-left** origin and
//! y growing downward, which is what a pointer on a rendered page produces.
//! The flip to PDF's bottom-left origin happens only in
//! [`crate::pipeline::layout`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an annotation, stable for the session.
pub type AnnotationId = uuid::Uuid;

/// A single mark targeting one page of the loaded document.
///
/// `page` is fixed at construction; there is no setter. Negative coordinates
/// are clamped to zero, on construction and on deserialisation alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AnnotationRecord")]
pub struct Annotation {
    id: AnnotationId,
    /// 1-based page number.
    page: u32,
    x: f32,
    y: f32,
    #[serde(flatten)]
    kind: AnnotationKind,
}

impl Annotation {
    /// Create an annotation of any kind. The store replaces the id on insert.
    pub fn new(page: u32, x: f32, y: f32, kind: AnnotationKind) -> Self {
        Self {
            id: AnnotationId::new_v4(),
            page,
            x: non_negative(x),
            y: non_negative(y),
            kind,
        }
    }

    pub fn text(page: u32, x: f32, y: f32, mark: TextMark) -> Self {
        Self::new(page, x, y, AnnotationKind::Text(mark))
    }

    pub fn image(page: u32, x: f32, y: f32, mark: ImageMark) -> Self {
        Self::new(page, x, y, AnnotationKind::Image(mark))
    }

    pub fn highlight(page: u32, x: f32, y: f32, mark: HighlightMark) -> Self {
        Self::new(page, x, y, AnnotationKind::Highlight(mark))
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: AnnotationId) {
        self.id = id;
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn kind(&self) -> &AnnotationKind {
        &self.kind
    }

    /// Short human-readable label: the text content for text marks, the
    /// kind name otherwise.
    pub fn label(&self) -> &str {
        match &self.kind {
            AnnotationKind::Text(t) => &t.content,
            AnnotationKind::Image(_) => "image",
            AnnotationKind::Highlight(_) => "highlight",
        }
    }
}

/// Wire shape of an [`Annotation`], checked before it becomes one.
#[derive(Deserialize)]
struct AnnotationRecord {
    id: AnnotationId,
    page: u32,
    x: f32,
    y: f32,
    #[serde(flatten)]
    kind: AnnotationKind,
}

impl TryFrom<AnnotationRecord> for Annotation {
    type Error = String;

    fn try_from(record: AnnotationRecord) -> Result<Self, Self::Error> {
        if record.page == 0 {
            return Err("page numbers start at 1".to_string());
        }
        let mut annotation = Annotation::new(record.page, record.x, record.y, record.kind);
        annotation.id = record.id;
        Ok(annotation)
    }
}

/// The closed set of annotation kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationKind {
    Text(TextMark),
    Image(ImageMark),
    Highlight(HighlightMark),
}

impl AnnotationKind {
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationKind::Text(_) => "text",
            AnnotationKind::Image(_) => "image",
            AnnotationKind::Highlight(_) => "highlight",
        }
    }
}

/// Text payload. `size` is passed through to the PDF unscaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMark {
    pub content: String,
    #[serde(default)]
    pub font: FontFamily,
    pub size: u32,
    /// Hex `#RRGGBB`; anything else renders black.
    pub color: String,
}

/// Image payload held as a `data:<mime>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ImageRecord")]
pub struct ImageMark {
    pub data_uri: String,
    width: f32,
    height: f32,
}

#[derive(Deserialize)]
struct ImageRecord {
    data_uri: String,
    width: f32,
    height: f32,
}

impl From<ImageRecord> for ImageMark {
    fn from(r: ImageRecord) -> Self {
        ImageMark::new(r.data_uri, r.width, r.height)
    }
}

impl ImageMark {
    pub fn new(data_uri: impl Into<String>, width: f32, height: f32) -> Self {
        Self {
            data_uri: data_uri.into(),
            width: non_negative(width),
            height: non_negative(height),
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }
}

/// Highlight payload, rendered as a translucent filled rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "HighlightRecord")]
pub struct HighlightMark {
    width: f32,
    height: f32,
    /// Hex `#RRGGBB`; anything else renders yellow.
    pub color: String,
}

#[derive(Deserialize)]
struct HighlightRecord {
    width: f32,
    height: f32,
    color: String,
}

impl From<HighlightRecord> for HighlightMark {
    fn from(r: HighlightRecord) -> Self {
        HighlightMark::new(r.width, r.height, r.color)
    }
}

impl HighlightMark {
    pub fn new(width: f32, height: f32, color: impl Into<String>) -> Self {
        Self {
            width: non_negative(width),
            height: non_negative(height),
            color: color.into(),
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }
}

fn non_negative(v: f32) -> f32 {
    v.max(0.0)
}

// ── Fonts ────────────────────────────────────────────────────────────────

/// Fonts available to text marks. Each maps onto one of the PDF standard 14
/// faces, so nothing has to be embedded from disk. Unknown names deserialise
/// as Helvetica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum FontFamily {
    /// Sans-serif default.
    #[default]
    Helvetica,
    /// Monospace.
    Courier,
    /// Serif.
    Times,
}

impl FontFamily {
    /// Resolve a family name. Unknown names fall back to Helvetica.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "courier" | "monospace" | "mono" => FontFamily::Courier,
            "times" | "times roman" | "timesroman" | "times-roman" | "serif" => FontFamily::Times,
            _ => FontFamily::Helvetica,
        }
    }

    /// Name understood by CSS-style text renderers (overlay hosts).
    pub fn css_name(&self) -> &'static str {
        match self {
            FontFamily::Helvetica => "Helvetica",
            FontFamily::Courier => "Courier",
            FontFamily::Times => "Times",
        }
    }
}

impl From<String> for FontFamily {
    fn from(name: String) -> Self {
        FontFamily::from_name(&name)
    }
}

impl fmt::Display for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_name())
    }
}

// ── Colours ──────────────────────────────────────────────────────────────

static RE_HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^#([a-f\d]{2})([a-f\d]{2})([a-f\d]{2})$").unwrap());

/// RGB colour with channels normalised to `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };
    pub const YELLOW: Rgb = Rgb { r: 1.0, g: 1.0, b: 0.0 };

    /// Parse `#RRGGBB` (either case). Shorthand, names and missing `#` are
    /// rejected.
    pub fn parse_hex(s: &str) -> Option<Rgb> {
        let caps = RE_HEX_COLOR.captures(s)?;
        let channel = |i: usize| -> Option<f32> {
            u8::from_str_radix(&caps[i], 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        Some(Rgb {
            r: channel(1)?,
            g: channel(2)?,
            b: channel(3)?,
        })
    }

    /// Parse `s`, or return `fallback` when it is malformed.
    pub fn from_hex_or(s: &str, fallback: Rgb) -> Rgb {
        Self::parse_hex(s).unwrap_or(fallback)
    }

    /// Channels scaled back to bytes.
    pub fn to_u8(self) -> [u8; 3] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_both_cases() {
        let c = Rgb::parse_hex("#FF8000").unwrap();
        assert_eq!(c.to_u8(), [255, 128, 0]);
        let c = Rgb::parse_hex("#ff8000").unwrap();
        assert_eq!(c.to_u8(), [255, 128, 0]);
        assert_eq!(c.r, 1.0);
        assert_eq!(c.b, 0.0);
    }

    #[test]
    fn parse_hex_rejects_malformed() {
        for bad in ["notacolor", "#fff", "ff8000", "#gg0000", "#ff800000", "", " #ff8000"] {
            assert!(Rgb::parse_hex(bad).is_none(), "accepted {bad:?}");
        }
    }

    #[test]
    fn fallback_colours() {
        assert_eq!(Rgb::from_hex_or("notacolor", Rgb::BLACK), Rgb::BLACK);
        assert_eq!(Rgb::from_hex_or("notacolor", Rgb::YELLOW), Rgb::YELLOW);
        assert_eq!(Rgb::from_hex_or("#0000ff", Rgb::BLACK).to_u8(), [0, 0, 255]);
    }

    #[test]
    fn font_family_fallback() {
        assert_eq!(FontFamily::from_name("Courier"), FontFamily::Courier);
        assert_eq!(FontFamily::from_name("Times"), FontFamily::Times);
        assert_eq!(FontFamily::from_name("serif"), FontFamily::Times);
        assert_eq!(FontFamily::from_name("Comic Sans"), FontFamily::Helvetica);
        assert_eq!(FontFamily::from_name(""), FontFamily::Helvetica);
    }

    #[test]
    fn negative_coordinates_clamp_to_zero() {
        let a = Annotation::highlight(1, -5.0, -0.5, HighlightMark::new(-10.0, 20.0, "#ffff00"));
        assert_eq!(a.x(), 0.0);
        assert_eq!(a.y(), 0.0);
        match a.kind() {
            AnnotationKind::Highlight(h) => assert_eq!(h.width(), 0.0),
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn serde_shape_is_tagged() {
        let a = Annotation::text(
            2,
            10.0,
            20.0,
            TextMark {
                content: "Hello".into(),
                font: FontFamily::Courier,
                size: 16,
                color: "#000000".into(),
            },
        );
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["type"], "text");
        assert_eq!(v["page"], 2);
        assert_eq!(v["content"], "Hello");
        let back: Annotation = serde_json::from_value(v).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn deserialised_annotations_keep_invariants() {
        let json = r##"{"id":"5f0c6a1e-8d4b-4c7e-9a51-2b3c4d5e6f70","page":1,"x":-50,"y":-1,
            "type":"highlight","width":-100,"height":20,"color":"#ffff00"}"##;
        let a: Annotation = serde_json::from_str(json).unwrap();
        assert_eq!((a.x(), a.y()), (0.0, 0.0));
        assert_eq!(a.id().to_string(), "5f0c6a1e-8d4b-4c7e-9a51-2b3c4d5e6f70");
        match a.kind() {
            AnnotationKind::Highlight(h) => assert_eq!((h.width(), h.height()), (0.0, 20.0)),
            other => panic!("unexpected kind {other:?}"),
        }

        let image: ImageMark =
            serde_json::from_str(r#"{"data_uri":"data:image/png;base64,AAAA","width":10,"height":-3}"#)
                .unwrap();
        assert_eq!((image.width(), image.height()), (10.0, 0.0));
    }

    #[test]
    fn page_zero_does_not_deserialise() {
        let json = r##"{"id":"5f0c6a1e-8d4b-4c7e-9a51-2b3c4d5e6f70","page":0,"x":0,"y":0,
            "type":"highlight","width":1,"height":1,"color":"#ffff00"}"##;
        let err = serde_json::from_str::<Annotation>(json).unwrap_err();
        assert!(err.to_string().contains("page numbers start at 1"), "{err}");
    }

    #[test]
    fn unknown_font_deserialises_as_helvetica() {
        let mark: TextMark = serde_json::from_str(
            r##"{"content":"Hi","font":"Comic Sans","size":12,"color":"#000000"}"##,
        )
        .unwrap();
        assert_eq!(mark.font, FontFamily::Helvetica);
        let mark: TextMark =
            serde_json::from_str(r##"{"content":"Hi","font":"Courier","size":12,"color":"#000000"}"##)
                .unwrap();
        assert_eq!(mark.font, FontFamily::Courier);
    }

    #[test]
    fn label_uses_text_content() {
        let t = Annotation::text(
            1,
            0.0,
            0.0,
            TextMark {
                content: "Note".into(),
                font: FontFamily::default(),
                size: 12,
                color: "#000000".into(),
            },
        );
        assert_eq!(t.label(), "Note");
        let h = Annotation::highlight(1, 0.0, 0.0, HighlightMark::new(1.0, 1.0, "#ffff00"));
        assert_eq!(h.label(), "highlight");
    }
}
