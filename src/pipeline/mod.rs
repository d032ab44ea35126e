//! Pipeline stages shared by every job.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and a backend (rasteriser, encoder) can be swapped
//! without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ load ──┬────────────────────────────────────▶ assemble  (merge)
//!                  └──▶ render ──▶ encode ──▶ pages ──┬──▶ assemble  (compress)
//!                      (pdfium)    (JPEG)             └──▶ archive   (convert)
//! ```
//!
//! 1. [`input`]   : type gate for uploads and local paths
//! 2. [`load`]    : parse and validate a PDF, read page geometry
//! 3. [`engine`]  : locate and bind the pdfium shared library
//! 4. [`render`]  : rasterise a single page; called from `spawn_blocking`
//! 5. [`encode`]  : lossy JPEG encoding at a quality factor
//! 6. [`pages`]   : the sequential skip-on-failure page loop
//! 7. [`assemble`]: merged PDFs and image-only PDFs via lopdf
//! 8. [`archive`] : zip packaging for the convert output

pub mod archive;
pub mod assemble;
pub mod encode;
pub mod engine;
pub mod input;
pub mod load;
pub mod pages;
pub mod render;
