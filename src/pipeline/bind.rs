//! pdfium library binding.
//!
//! Resolution order (first match wins):
//!
//! 1. `PDFIUM_LIB_PATH` — an explicit path to the shared library
//! 2. the current working directory (`./libpdfium.so` and friends)
//! 3. the system library search path
//!
//! The binding is made once per process and shared: pdfium initialises
//! global state, and tearing it down while another blocking task still holds
//! a document would be unsound. `thread_safe` serialises every call into the
//! library, so handing out `&'static Pdfium` to concurrent tasks is fine.

use crate::error::EditorError;
use pdfium_render::prelude::*;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Environment variable naming an explicit pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

static PDFIUM: OnceLock<Result<Pdfium, String>> = OnceLock::new();

/// The process-wide pdfium instance, bound on first use.
///
/// A failed binding is remembered; the library does not appear mid-process.
pub fn pdfium() -> Result<&'static Pdfium, EditorError> {
    PDFIUM
        .get_or_init(bind)
        .as_ref()
        .map_err(|detail| EditorError::PdfiumBindingFailed(detail.clone()))
}

/// True when a pdfium library can be bound in this process.
pub fn pdfium_available() -> bool {
    pdfium().is_ok()
}

fn bind() -> Result<Pdfium, String> {
    let bindings = match explicit_library() {
        Some(path) => {
            debug!("Binding pdfium from {}", path);
            Pdfium::bind_to_library(path)
        }
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")),
    }
    .or_else(|_| Pdfium::bind_to_system_library())
    .map_err(|e| format!("{e:?}"))?;

    info!("pdfium bound");
    Ok(Pdfium::new(bindings))
}

fn explicit_library() -> Option<String> {
    std::env::var(PDFIUM_LIB_PATH_ENV)
        .ok()
        .filter(|p| !p.is_empty())
}
