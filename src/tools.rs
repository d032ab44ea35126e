//! One-shot helpers for callers working with files on disk.

use crate::artifact::OutputArtifact;
use crate::error::ToolkitError;
use crate::pipeline::input::accept_path;
use crate::pipeline::load::{DocumentInfo, SourceDocument};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Load a PDF from disk and summarise it. Needs no rasteriser.
pub fn inspect(path: impl AsRef<Path>) -> Result<DocumentInfo, ToolkitError> {
    let file = accept_path(path)?;
    Ok(SourceDocument::try_from(file)?.info())
}

/// Write an artifact into `dir` under its suggested file name.
///
/// Uses atomic write (temp file + rename) so a crash never leaves a
/// partial file under the final name.
pub async fn write_artifact(
    dir: impl AsRef<Path>,
    artifact: &OutputArtifact,
) -> Result<PathBuf, ToolkitError> {
    let dir = dir.as_ref();
    let path = dir.join(sanitize_file_name(&artifact.filename));
    let write_err = |source| ToolkitError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(dir).await.map_err(write_err)?;

    let tmp_path = path.with_extension("part");
    tokio::fs::write(&tmp_path, &artifact.bytes)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(write_err)?;

    debug!(path = %path.display(), bytes = artifact.bytes.len(), "artifact written");
    Ok(path)
}

/// Keep only the final path component of a suggested name.
fn sanitize_file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "output".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactStore;

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("merged-document.pdf"), "merged-document.pdf");
        assert_eq!(sanitize_file_name(""), "output");
    }

    #[tokio::test]
    async fn writes_artifact_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new();
        let handle = store.emit(b"%PDF-1.5 data".to_vec(), "application/pdf", "out.pdf");

        let path = write_artifact(dir.path().join("nested"), handle.artifact())
            .await
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "out.pdf");
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.5 data");
        assert!(!path.with_extension("part").exists());
    }

    #[test]
    fn inspect_missing_file() {
        assert!(matches!(
            inspect("/no/such/file.pdf").unwrap_err(),
            ToolkitError::FileNotFound { .. }
        ));
    }
}
