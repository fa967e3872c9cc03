//! Declarative placement scripts.
//!
//! A script is a JSON list of placement actions, applied in order to an
//! [`EditSession`]. It is how the CLI drives a session without a pointer:
//!
//! ```json
//! {
//!   "actions": [
//!     { "action": "text", "page": 1, "x": 50, "y": 100, "content": "Hello", "font": "Courier" },
//!     { "action": "highlight", "page": 2, "x": 10, "y": 20 },
//!     { "action": "image", "page": 1, "path": "logo.png" }
//!   ]
//! }
//! ```
//!
//! Omitted sizes and colours take the session's configured defaults; an
//! image without `x`/`y` lands at the configured upload origin.

use crate::annotation::{Annotation, AnnotationId, FontFamily, HighlightMark, ImageMark, TextMark};
use crate::error::EditorError;
use crate::pipeline::encode::encode_image;
use crate::session::EditSession;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditScript {
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    Text {
        page: u32,
        x: f32,
        y: f32,
        content: String,
        #[serde(default)]
        font: Option<String>,
        #[serde(default)]
        size: Option<u32>,
        #[serde(default)]
        color: Option<String>,
    },
    Highlight {
        page: u32,
        x: f32,
        y: f32,
        #[serde(default)]
        width: Option<f32>,
        #[serde(default)]
        height: Option<f32>,
        #[serde(default)]
        color: Option<String>,
    },
    Image {
        page: u32,
        path: PathBuf,
        #[serde(default)]
        x: Option<f32>,
        #[serde(default)]
        y: Option<f32>,
        #[serde(default)]
        width: Option<f32>,
        #[serde(default)]
        height: Option<f32>,
    },
}

impl EditScript {
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        serde_json::from_str(json)
            .map_err(|e| EditorError::InvalidInput(format!("invalid edit script: {e}")))
    }

    /// Read a script file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, EditorError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|_| EditorError::FileNotFound {
                path: path.to_path_buf(),
            })?;
        Self::from_json(&json)
    }

    /// Apply every action to `session`, in order.
    ///
    /// Image paths are resolved against `base_dir`. Stops at the first
    /// action that fails; actions before it stay applied.
    pub async fn apply(
        &self,
        session: &mut EditSession,
        base_dir: &Path,
    ) -> Result<Vec<AnnotationId>, EditorError> {
        let mut ids = Vec::with_capacity(self.actions.len());
        for action in &self.actions {
            let annotation = action.to_annotation(session, base_dir).await?;
            ids.push(session.add(annotation)?);
        }
        debug!("Script placed {} annotations", ids.len());
        Ok(ids)
    }
}

impl Action {
    async fn to_annotation(
        &self,
        session: &EditSession,
        base_dir: &Path,
    ) -> Result<Annotation, EditorError> {
        let config = session.config();
        let annotation = match self {
            Action::Text {
                page,
                x,
                y,
                content,
                font,
                size,
                color,
            } => {
                if content.trim().is_empty() {
                    return Err(EditorError::InvalidInput(
                        "text action needs non-empty content".into(),
                    ));
                }
                Annotation::text(
                    *page,
                    *x,
                    *y,
                    TextMark {
                        content: content.clone(),
                        font: font
                            .as_deref()
                            .map(FontFamily::from_name)
                            .unwrap_or_default(),
                        size: size.unwrap_or(config.font_size).clamp(8, 72),
                        color: color.clone().unwrap_or_else(|| config.color.clone()),
                    },
                )
            }
            Action::Highlight {
                page,
                x,
                y,
                width,
                height,
                color,
            } => Annotation::highlight(
                *page,
                *x,
                *y,
                HighlightMark::new(
                    width.unwrap_or(config.highlight_width),
                    height.unwrap_or(config.highlight_height),
                    color.clone().unwrap_or_else(|| config.color.clone()),
                ),
            ),
            Action::Image {
                page,
                path,
                x,
                y,
                width,
                height,
            } => {
                let full = base_dir.join(path);
                let bytes = tokio::fs::read(&full)
                    .await
                    .map_err(|e| match e.kind() {
                        std::io::ErrorKind::PermissionDenied => {
                            EditorError::PermissionDenied { path: full.clone() }
                        }
                        _ => EditorError::FileNotFound { path: full.clone() },
                    })?;
                let (ox, oy) = config.image_origin;
                let (w, h) = config.image_size;
                Annotation::image(
                    *page,
                    x.unwrap_or(ox),
                    y.unwrap_or(oy),
                    ImageMark::new(
                        encode_image(&bytes),
                        width.unwrap_or(w),
                        height.unwrap_or(h),
                    ),
                )
            }
        };
        Ok(annotation)
    }
}
