//! Directory-backed temporary artifact store

use crate::error::{EditorError, EditorResult};
use crate::services::ArtifactStore;
use std::io::ErrorKind as IoKind;
use std::path::{Path, PathBuf};
use topo_model::ArtifactId;

/// Stages uploaded streams as files named by a random id
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    dir: PathBuf,
}

impl LocalArtifactStore {
    /// Open (creating if needed) a store rooted at `dir`
    ///
    /// # Errors
    /// Returns error if the directory cannot be created
    pub fn open(dir: impl Into<PathBuf>) -> EditorResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| EditorError::io(format!("creating artifact dir {}", dir.display()), e))?;
        Ok(Self { dir })
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, id: &ArtifactId) -> EditorResult<PathBuf> {
        // ids are generated uuids; anything else could escape the store
        if !id.as_str().chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(EditorError::Validation(format!("invalid artifact id <{id}>")));
        }
        Ok(self.dir.join(id.as_str()))
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn store(&self, content: &[u8]) -> EditorResult<ArtifactId> {
        let id = ArtifactId::generate();
        let path = self.path_of(&id)?;
        std::fs::write(&path, content)
            .map_err(|e| EditorError::io(format!("staging artifact {id}"), e))?;
        tracing::debug!(artifact = %id, bytes = content.len(), "artifact staged");
        Ok(id)
    }

    fn get(&self, id: &ArtifactId) -> EditorResult<Vec<u8>> {
        let path = self.path_of(id)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            IoKind::NotFound => EditorError::NotFound(format!("staged artifact <{id}>")),
            _ => EditorError::io(format!("reading artifact {id}"), e),
        })
    }

    fn delete(&self, id: &ArtifactId) -> EditorResult<()> {
        let path = self.path_of(id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoKind::NotFound => Ok(()),
            Err(e) => Err(EditorError::io(format!("deleting artifact {id}"), e)),
        }
    }

    fn exists(&self, id: &ArtifactId) -> bool {
        self.path_of(id).map(|p| p.is_file()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn store_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::open(dir.path().join("tmp")).unwrap();

        let id = store.store(b"payload").unwrap();
        assert!(store.exists(&id));
        assert_eq!(store.get(&id).unwrap(), b"payload");

        store.delete(&id).unwrap();
        assert!(!store.exists(&id));
        assert_eq!(store.get(&id).unwrap_err().kind(), ErrorKind::NotFound);
        // second delete is a no-op
        store.delete(&id).unwrap();
    }

    #[test]
    fn foreign_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::open(dir.path()).unwrap();
        let id = ArtifactId::new("../escape");
        assert!(!store.exists(&id));
        assert_eq!(store.get(&id).unwrap_err().kind(), ErrorKind::Validation);
    }
}
