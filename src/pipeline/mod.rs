//! Pipeline stages for loading, compositing and previewing a PDF.
//!
//! Each submodule implements exactly one step. Only `layout` and `encode`
//! are free of pdfium, which keeps the coordinate math and the image
//! payload handling testable without the native library.
//!
//! ## Data Flow
//!
//! ```text
//! load ──▶ (store) ──▶ layout ──▶ draw ──▶ bytes
//! (parse)              (plan)     (pdfium)
//!                                    ▲
//!                  encode ───────────┘ (data URI → PNG/JPEG)
//! ```
//!
//! 1. [`bind`]   — bind the pdfium shared library once per process
//! 2. [`load`]   — validate the declared type, parse, record page geometry
//! 3. [`encode`] — image bytes ⇄ data URIs; PNG/JPEG detection for embedding
//! 4. [`layout`] — flip top-left annotation coordinates into PDF space
//! 5. [`draw`]   — apply the plan to a fresh copy and serialise it; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 6. [`render`] — rasterise a page for previews

pub mod bind;
pub(crate) mod draw;
pub mod encode;
pub mod layout;
pub mod load;
pub mod render;
