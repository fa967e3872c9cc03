//! Configuration types for annotation placement and export.
//!
//! Every default the editor relies on (highlight size, where uploaded images
//! land, output filename, preview zoom) lives in [`EditorConfig`], built via
//! its [`EditorConfigBuilder`].

use crate::error::EditorError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Filename offered for the exported document.
pub const DEFAULT_OUTPUT_FILENAME: &str = "edited-document.pdf";

/// Configuration for an editing session and its export.
///
/// # Example
/// ```rust
/// use pdf_annotator::EditorConfig;
///
/// let config = EditorConfig::builder()
///     .highlight_size(120.0, 24.0)
///     .preview_scale(2.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.highlight_width, 120.0);
/// ```
#[derive(Clone)]
pub struct EditorConfig {
    /// Font size for new text marks, in points. Range: 8–72. Default: 16.
    pub font_size: u32,

    /// Colour shared by the text and highlight tools. Default: `#000000`.
    pub color: String,

    /// Width of a placed highlight. Default: 100.
    pub highlight_width: f32,

    /// Height of a placed highlight. Default: 20.
    pub highlight_height: f32,

    /// Fill opacity of highlights in the export and the overlay. Default: 0.3.
    pub highlight_opacity: f32,

    /// Top-left position of an uploaded image, ignoring the pointer.
    /// Default: (100, 100).
    pub image_origin: (f32, f32),

    /// Size an uploaded image is placed at. Default: 150 × 150.
    pub image_size: (f32, f32),

    /// Preview zoom factor. Range: 0.5–2.5. Default: 1.5.
    pub preview_scale: f32,

    /// Filename for the exported document. Default: `edited-document.pdf`.
    pub output_filename: String,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional per-annotation export progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            font_size: 16,
            color: "#000000".to_string(),
            highlight_width: 100.0,
            highlight_height: 20.0,
            highlight_opacity: 0.3,
            image_origin: (100.0, 100.0),
            image_size: (150.0, 150.0),
            preview_scale: 1.5,
            output_filename: DEFAULT_OUTPUT_FILENAME.to_string(),
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for EditorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorConfig")
            .field("font_size", &self.font_size)
            .field("color", &self.color)
            .field("highlight_width", &self.highlight_width)
            .field("highlight_height", &self.highlight_height)
            .field("highlight_opacity", &self.highlight_opacity)
            .field("image_origin", &self.image_origin)
            .field("image_size", &self.image_size)
            .field("preview_scale", &self.preview_scale)
            .field("output_filename", &self.output_filename)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExportProgressCallback>"),
            )
            .finish()
    }
}

impl EditorConfig {
    /// Create a new builder for `EditorConfig`.
    pub fn builder() -> EditorConfigBuilder {
        EditorConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`EditorConfig`].
#[derive(Debug)]
pub struct EditorConfigBuilder {
    config: EditorConfig,
}

impl EditorConfigBuilder {
    pub fn font_size(mut self, size: u32) -> Self {
        self.config.font_size = size.clamp(8, 72);
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.config.color = color.into();
        self
    }

    pub fn highlight_size(mut self, width: f32, height: f32) -> Self {
        self.config.highlight_width = width;
        self.config.highlight_height = height;
        self
    }

    pub fn highlight_opacity(mut self, opacity: f32) -> Self {
        self.config.highlight_opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn image_origin(mut self, x: f32, y: f32) -> Self {
        self.config.image_origin = (x, y);
        self
    }

    pub fn image_size(mut self, width: f32, height: f32) -> Self {
        self.config.image_size = (width, height);
        self
    }

    pub fn preview_scale(mut self, scale: f32) -> Self {
        self.config.preview_scale = scale.clamp(0.5, 2.5);
        self
    }

    pub fn output_filename(mut self, name: impl Into<String>) -> Self {
        self.config.output_filename = name.into();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EditorConfig, EditorError> {
        let c = &self.config;
        if !(c.highlight_width > 0.0 && c.highlight_height > 0.0) {
            return Err(EditorError::InvalidConfig(format!(
                "Highlight size must be positive, got {}×{}",
                c.highlight_width, c.highlight_height
            )));
        }
        if !(c.image_size.0 > 0.0 && c.image_size.1 > 0.0) {
            return Err(EditorError::InvalidConfig(format!(
                "Image size must be positive, got {}×{}",
                c.image_size.0, c.image_size.1
            )));
        }
        if c.image_origin.0 < 0.0 || c.image_origin.1 < 0.0 {
            return Err(EditorError::InvalidConfig(
                "Image origin must not be negative".into(),
            ));
        }
        if c.output_filename.trim().is_empty() {
            return Err(EditorError::InvalidConfig(
                "Output filename must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Connection settings for the hosted function endpoints.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,

    /// Anonymous/public API key sent as bearer token and `apikey` header.
    pub api_key: String,

    /// Per-request timeout in seconds. Default: 60.
    pub timeout_secs: u64,
}

impl ServiceConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout_secs: 60,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// URL of the named function, tolerant of a trailing slash on the base.
    pub fn function_url(&self, name: &str) -> String {
        format!("{}/functions/v1/{}", self.base_url.trim_end_matches('/'), name)
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_editor_behaviour() {
        let c = EditorConfig::default();
        assert_eq!(c.font_size, 16);
        assert_eq!(c.highlight_width, 100.0);
        assert_eq!(c.highlight_height, 20.0);
        assert_eq!(c.image_origin, (100.0, 100.0));
        assert_eq!(c.image_size, (150.0, 150.0));
        assert_eq!(c.output_filename, "edited-document.pdf");
    }

    #[test]
    fn builder_clamps() {
        let c = EditorConfig::builder()
            .font_size(200)
            .preview_scale(9.0)
            .highlight_opacity(1.5)
            .build()
            .unwrap();
        assert_eq!(c.font_size, 72);
        assert_eq!(c.preview_scale, 2.5);
        assert_eq!(c.highlight_opacity, 1.0);
    }

    #[test]
    fn builder_rejects_degenerate_sizes() {
        assert!(EditorConfig::builder().highlight_size(0.0, 20.0).build().is_err());
        assert!(EditorConfig::builder().image_size(150.0, -1.0).build().is_err());
        assert!(EditorConfig::builder().output_filename("  ").build().is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let c = EditorConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
    }

    #[test]
    fn function_url_joins_cleanly() {
        let s = ServiceConfig::new("https://example.supabase.co/", "key");
        assert_eq!(
            s.function_url("youtube-search"),
            "https://example.supabase.co/functions/v1/youtube-search"
        );
    }
}
