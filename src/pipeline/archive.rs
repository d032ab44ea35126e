//! ArchivePackager: collect named entries into an in-memory zip.

use crate::error::ToolkitError;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const ZIP_MIME: &str = "application/zip";

/// Builds a zip archive entry by entry.
///
/// Entries are stored uncompressed: they are JPEGs already.
pub struct ArchivePackager {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    names: Vec<String>,
    seen: HashSet<String>,
}

impl Default for ArchivePackager {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchivePackager {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            names: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Append an entry. Entry names must be unique.
    pub fn add(&mut self, name: &str, bytes: &[u8]) -> Result<(), ToolkitError> {
        if !self.seen.insert(name.to_string()) {
            return Err(ToolkitError::Internal(format!(
                "duplicate archive entry '{name}'"
            )));
        }
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        self.writer
            .start_file(name, options)
            .map_err(|e| archive_failure(name, e))?;
        self.writer
            .write_all(bytes)
            .map_err(|e| archive_failure(name, e))?;
        debug!(entry = name, bytes = bytes.len(), "archived entry");
        self.names.push(name.to_string());
        Ok(())
    }

    /// Entry names in insertion order.
    pub fn entry_names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn finish(self) -> Result<Vec<u8>, ToolkitError> {
        let cursor = self
            .writer
            .finish()
            .map_err(|e| ToolkitError::PipelineFailure {
                detail: format!("failed to finalise zip archive: {e}"),
            })?;
        Ok(cursor.into_inner())
    }
}

fn archive_failure(name: &str, e: impl std::fmt::Display) -> ToolkitError {
    ToolkitError::PipelineFailure {
        detail: format!("failed to write archive entry '{name}': {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn entries_keep_insertion_order_and_content() {
        let mut zip = ArchivePackager::new();
        zip.add("page_1.jpg", b"one").unwrap();
        zip.add("page_3.jpg", b"three").unwrap();
        assert_eq!(zip.entry_names(), ["page_1.jpg", "page_3.jpg"]);

        let bytes = zip.finish().unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut entry = archive.by_index(1).unwrap();
        assert_eq!(entry.name(), "page_3.jpg");
        assert_eq!(entry.compression(), CompressionMethod::Stored);
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "three");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut zip = ArchivePackager::new();
        zip.add("page_1.jpg", b"a").unwrap();
        assert!(zip.add("page_1.jpg", b"b").is_err());
        assert_eq!(zip.len(), 1);
    }

    #[test]
    fn empty_archive_is_still_valid() {
        let bytes = ArchivePackager::new().finish().unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
