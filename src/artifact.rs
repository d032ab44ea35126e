//! ArtifactEmitter: downloadable outputs behind revocable references.
//!
//! A finished job hands its bytes to an [`ArtifactStore`] and keeps the
//! returned [`ArtifactHandle`]. The handle is the only owner of the store
//! entry: revoking it (or dropping it) removes the entry, after which the
//! `artifact:<uuid>` reference no longer resolves. Revocation happens exactly
//! once per handle.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;
use uuid::Uuid;

const REFERENCE_SCHEME: &str = "artifact:";

/// Bytes plus what a download needs to present them.
#[derive(Debug)]
pub struct OutputArtifact {
    pub id: Uuid,
    pub bytes: Vec<u8>,
    pub mime: String,
    pub filename: String,
}

impl OutputArtifact {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Registry of live artifacts. Clones share the same registry.
#[derive(Clone, Default)]
pub struct ArtifactStore {
    inner: Arc<Mutex<HashMap<Uuid, Arc<OutputArtifact>>>>,
}

impl fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("live", &self.live_count())
            .finish()
    }
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an artifact and return the handle that owns it.
    pub fn emit(
        &self,
        bytes: Vec<u8>,
        mime: impl Into<String>,
        filename: impl Into<String>,
    ) -> ArtifactHandle {
        let artifact = Arc::new(OutputArtifact {
            id: Uuid::new_v4(),
            bytes,
            mime: mime.into(),
            filename: filename.into(),
        });
        self.lock().insert(artifact.id, Arc::clone(&artifact));
        debug!(
            id = %artifact.id,
            filename = %artifact.filename,
            bytes = artifact.bytes.len(),
            "artifact emitted"
        );
        ArtifactHandle {
            store: self.clone(),
            artifact,
            revoked: false,
        }
    }

    pub fn resolve(&self, id: Uuid) -> Option<Arc<OutputArtifact>> {
        self.lock().get(&id).cloned()
    }

    /// Resolve an `artifact:<uuid>` reference string.
    pub fn resolve_reference(&self, reference: &str) -> Option<Arc<OutputArtifact>> {
        let id = reference.strip_prefix(REFERENCE_SCHEME)?;
        Uuid::parse_str(id).ok().and_then(|id| self.resolve(id))
    }

    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn remove(&self, id: Uuid) -> bool {
        self.lock().remove(&id).is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Arc<OutputArtifact>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owning reference to one emitted artifact.
pub struct ArtifactHandle {
    store: ArtifactStore,
    artifact: Arc<OutputArtifact>,
    revoked: bool,
}

impl fmt::Debug for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactHandle")
            .field("id", &self.artifact.id)
            .field("filename", &self.artifact.filename)
            .field("bytes", &self.artifact.bytes.len())
            .finish()
    }
}

impl ArtifactHandle {
    pub fn id(&self) -> Uuid {
        self.artifact.id
    }

    /// Opaque reference that resolves through the store while the handle lives.
    pub fn reference(&self) -> String {
        format!("{REFERENCE_SCHEME}{}", self.artifact.id)
    }

    pub fn artifact(&self) -> &OutputArtifact {
        &self.artifact
    }

    pub fn bytes(&self) -> &[u8] {
        &self.artifact.bytes
    }

    pub fn filename(&self) -> &str {
        &self.artifact.filename
    }

    pub fn mime(&self) -> &str {
        &self.artifact.mime
    }

    /// Remove the artifact from the store.
    pub fn revoke(mut self) {
        self.revoke_inner();
    }

    fn revoke_inner(&mut self) {
        if self.revoked {
            return;
        }
        self.revoked = true;
        if self.store.remove(self.artifact.id) {
            debug!(id = %self.artifact.id, "artifact revoked");
        }
    }
}

impl Drop for ArtifactHandle {
    fn drop(&mut self) {
        self.revoke_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_and_resolve() {
        let store = ArtifactStore::new();
        let handle = store.emit(vec![1, 2, 3], "application/pdf", "out.pdf");
        assert_eq!(store.live_count(), 1);

        let found = store.resolve(handle.id()).unwrap();
        assert_eq!(found.bytes, vec![1, 2, 3]);
        assert_eq!(found.filename, "out.pdf");

        let by_ref = store.resolve_reference(&handle.reference()).unwrap();
        assert_eq!(by_ref.id, handle.id());
    }

    #[test]
    fn revoke_removes_entry() {
        let store = ArtifactStore::new();
        let handle = store.emit(vec![0], "application/zip", "a.zip");
        let reference = handle.reference();
        handle.revoke();
        assert_eq!(store.live_count(), 0);
        assert!(store.resolve_reference(&reference).is_none());
    }

    #[test]
    fn drop_revokes() {
        let store = ArtifactStore::new();
        let id = {
            let handle = store.emit(vec![0], "image/jpeg", "a.jpg");
            handle.id()
        };
        assert!(store.resolve(id).is_none());
    }

    #[test]
    fn handles_are_independent() {
        let store = ArtifactStore::new();
        let a = store.emit(vec![1], "application/pdf", "a.pdf");
        let b = store.emit(vec![2], "application/pdf", "b.pdf");
        assert_ne!(a.id(), b.id());
        a.revoke();
        assert_eq!(store.live_count(), 1);
        assert!(store.resolve(b.id()).is_some());
    }

    #[test]
    fn malformed_reference_does_not_resolve() {
        let store = ArtifactStore::new();
        assert!(store.resolve_reference("blob:nope").is_none());
        assert!(store.resolve_reference("artifact:not-a-uuid").is_none());
    }
}
