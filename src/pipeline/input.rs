//! Acquisition boundary: decide which offered files reach a job.
//!
//! Uploads carry a declared MIME type; paths only have an extension. Both
//! are reduced to an [`AcceptedFile`] here so jobs never see anything that
//! failed the type gate. A rejection never touches job state.

use crate::error::ToolkitError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const PDF_MIME: &str = "application/pdf";

/// Shown when a single selected file is not a PDF.
pub const INVALID_PDF_MESSAGE: &str = "Please select a valid PDF file.";

/// Shown when a drop contained no PDF at all.
pub const INVALID_DROP_MESSAGE: &str = "Please drop valid PDF files.";

/// Shown when the image compressor is offered a non-image.
pub const INVALID_IMAGE_MESSAGE: &str = "Please select a valid image file.";

/// A file as offered by the user, before the type gate.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }
}

/// A file that passed the type gate.
#[derive(Debug, Clone)]
pub struct AcceptedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Result of a multi-file selection.
#[derive(Debug, Default)]
pub struct Partitioned {
    pub accepted: Vec<AcceptedFile>,
    pub rejected: Vec<ToolkitError>,
}

fn rejected(name: &str, reason: &str) -> ToolkitError {
    ToolkitError::RejectedFile {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Accept one uploaded file if it declares `application/pdf`.
pub fn accept_upload(
    name: impl Into<String>,
    declared_mime: &str,
    bytes: Vec<u8>,
) -> Result<AcceptedFile, ToolkitError> {
    let name = name.into();
    if !is_pdf_mime(declared_mime) {
        debug!(name = %name, mime = declared_mime, "upload rejected");
        return Err(rejected(&name, INVALID_PDF_MESSAGE));
    }
    Ok(AcceptedFile {
        name,
        mime: PDF_MIME.to_string(),
        bytes,
    })
}

/// Accept one uploaded file if it declares an `image/*` type.
pub fn accept_image_upload(
    name: impl Into<String>,
    declared_mime: &str,
    bytes: Vec<u8>,
) -> Result<AcceptedFile, ToolkitError> {
    let name = name.into();
    if !is_image_mime(declared_mime) {
        debug!(name = %name, mime = declared_mime, "image upload rejected");
        return Err(rejected(&name, INVALID_IMAGE_MESSAGE));
    }
    Ok(AcceptedFile {
        name,
        mime: normalise_mime(declared_mime),
        bytes,
    })
}

/// Split a multi-file selection into PDFs (in order) and rejections.
///
/// Non-PDFs are dropped from the selection. A non-empty selection with no PDF
/// in it yields one extra [`INVALID_DROP_MESSAGE`] rejection.
pub fn partition_uploads(files: impl IntoIterator<Item = Upload>) -> Partitioned {
    let mut out = Partitioned::default();
    let mut offered = 0usize;

    for file in files {
        offered += 1;
        match accept_upload(file.name, &file.mime, file.bytes) {
            Ok(accepted) => out.accepted.push(accepted),
            Err(e) => out.rejected.push(e),
        }
    }

    if offered > 0 && out.accepted.is_empty() {
        warn!(offered, "selection contained no PDF files");
        out.rejected.push(rejected("selection", INVALID_DROP_MESSAGE));
    }
    out
}

/// Read a PDF from disk. The MIME type is inferred from the extension.
pub fn accept_path(path: impl AsRef<Path>) -> Result<AcceptedFile, ToolkitError> {
    let path = path.as_ref();
    let mime = mime_from_extension(path).unwrap_or("application/octet-stream");
    let bytes = read_local(path)?;
    accept_upload(display_name(path), mime, bytes)
}

/// Read an image from disk. The MIME type is inferred from the extension.
pub fn accept_image_path(path: impl AsRef<Path>) -> Result<AcceptedFile, ToolkitError> {
    let path = path.as_ref();
    let mime = mime_from_extension(path).unwrap_or("application/octet-stream");
    let bytes = read_local(path)?;
    accept_image_upload(display_name(path), mime, bytes)
}

/// Map a file extension to the MIME type a browser would declare for it.
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(PDF_MIME),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "zip" => Some("application/zip"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

fn normalise_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn is_pdf_mime(mime: &str) -> bool {
    normalise_mime(mime) == PDF_MIME
}

fn is_image_mime(mime: &str) -> bool {
    normalise_mime(mime).starts_with("image/")
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_local(path: &Path) -> Result<Vec<u8>, ToolkitError> {
    let owned = || PathBuf::from(path);
    match std::fs::read(path) {
        Ok(bytes) => {
            debug!(path = %path.display(), bytes = bytes.len(), "read local file");
            Ok(bytes)
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            Err(ToolkitError::PermissionDenied { path: owned() })
        }
        Err(_) => Err(ToolkitError::FileNotFound { path: owned() }),
    }
}
