//! Save journal
//!
//! Every working-tree write made while saving goes through a [`SaveJournal`],
//! which keeps the bytes the file held before (or notes that it did not
//! exist). If the save fails, [`SaveJournal::rollback`] puts the working tree
//! back the way it was.

use crate::error::{EditorError, EditorResult};
use std::collections::HashSet;
use std::io::ErrorKind as IoKind;
use std::path::{Path, PathBuf};
use topo_model::{ArchivePath, ArtifactId};

#[derive(Debug)]
struct Entry {
    path: PathBuf,
    previous: Option<Vec<u8>>,
}

/// Undo log of the working-tree writes of one save
#[derive(Debug)]
pub struct SaveJournal {
    root: PathBuf,
    entries: Vec<Entry>,
    journaled: HashSet<PathBuf>,
    promoted: Vec<(ArchivePath, ArtifactId)>,
}

impl SaveJournal {
    /// Journal for writes below `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Vec::new(),
            journaled: HashSet::new(),
            promoted: Vec::new(),
        }
    }

    /// Working tree root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` at `path`, remembering what was there first
    ///
    /// # Errors
    /// Filesystem failures
    pub fn write(&mut self, path: &ArchivePath, bytes: &[u8]) -> EditorResult<()> {
        let target = self.root.join(path.to_relative_path());
        if self.journaled.insert(target.clone()) {
            let previous = match std::fs::read(&target) {
                Ok(previous) => Some(previous),
                Err(e) if e.kind() == IoKind::NotFound => None,
                Err(e) => return Err(EditorError::io(format!("reading {}", target.display()), e)),
            };
            self.entries.push(Entry {
                path: target.clone(),
                previous,
            });
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| EditorError::io(format!("creating {}", parent.display()), e))?;
        }
        std::fs::write(&target, bytes).map_err(|e| EditorError::io(format!("writing {}", target.display()), e))
    }

    /// Record that the staged artifact `artifact` now lives at `path`
    pub fn promote(&mut self, path: ArchivePath, artifact: ArtifactId) {
        self.promoted.push((path, artifact));
    }

    /// Staged artifacts promoted so far
    #[must_use]
    pub fn promoted(&self) -> &[(ArchivePath, ArtifactId)] {
        &self.promoted
    }

    /// Number of distinct files written
    #[must_use]
    pub fn written(&self) -> usize {
        self.entries.len()
    }

    /// Restore every written file, newest first
    ///
    /// Keeps going after a failure and reports the first one.
    ///
    /// # Errors
    /// The first filesystem failure met
    pub fn rollback(self) -> EditorResult<()> {
        let mut first_error = None;
        for entry in self.entries.into_iter().rev() {
            let result = match &entry.previous {
                Some(bytes) => std::fs::write(&entry.path, bytes),
                None => match std::fs::remove_file(&entry.path) {
                    Err(e) if e.kind() == IoKind::NotFound => Ok(()),
                    other => other,
                },
            };
            if let Err(e) = result {
                tracing::error!(path = %entry.path.display(), error = %e, "failed to restore file");
                first_error.get_or_insert_with(|| EditorError::io(format!("restoring {}", entry.path.display()), e));
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
