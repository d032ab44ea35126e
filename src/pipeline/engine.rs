//! Binding the native pdfium library.
//!
//! pdfium is loaded at runtime, so a missing library is an ordinary error
//! rather than a link failure. Lookup order:
//!
//! 1. the explicit path from [`crate::ToolkitConfig::pdfium_library_path`]
//! 2. `PDFIUM_LIB_PATH`
//! 3. the working directory
//! 4. the system library search path
//!
//! Each entry may name the library file itself or the directory holding it.

use crate::error::ToolkitError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind pdfium, trying each candidate location in order.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, ToolkitError> {
    let mut attempts = Vec::new();

    for candidate in candidates(explicit) {
        match Pdfium::bind_to_library(&candidate) {
            Ok(bindings) => {
                debug!(path = %candidate.display(), "bound pdfium");
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => attempts.push(format!("{}: {:?}", candidate.display(), e)),
        }
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => {
            debug!("bound system pdfium");
            Ok(Pdfium::new(bindings))
        }
        Err(e) => {
            attempts.push(format!("system library: {:?}", e));
            Err(ToolkitError::PdfiumBindingFailed(attempts.join("; ")))
        }
    }
}

fn candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = explicit {
        paths.push(library_file(p));
    }
    if let Ok(p) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !p.is_empty() {
            paths.push(library_file(Path::new(&p)));
        }
    }
    paths.push(library_file(Path::new(".")));
    paths
}

fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(Pdfium::pdfium_platform_library_name())
    } else {
        path.to_path_buf()
    }
}
