//! Edition context: the per-document mutable state
//!
//! A context owns the live document and its file tree, the operation log and
//! both cursors. Two locks guard it:
//!
//! - `current_operation` is the in-flight marker. A call claims it for its
//!   whole duration; a second call finding it set fails fast.
//! - `state` guards the document, tree, log and cursors.
//!
//! When both are needed the marker is locked first.

use crate::config::EditorConfig;
use crate::error::{EditorError, EditorResult};
use crate::operation::Operation;
use crate::services::{ArtifactStore, EditorServices};
use parking_lot::{Mutex, MutexGuard};
use std::path::{Path, PathBuf};
use topo_model::{ArchivePath, Document, DocumentId, FileTree, OperationId};

/// The materialized state operations apply to
#[derive(Debug, Clone, PartialEq)]
pub struct Workspace {
    pub document: Document,
    pub tree: FileTree,
}

/// Log and cursors of a context, plus the workspace they materialize
#[derive(Debug)]
pub struct EditionState {
    pub(crate) workspace: Workspace,
    pub(crate) operations: Vec<Operation>,
    /// Last applied operation, `None` for the pristine state
    pub(crate) last_operation_index: Option<usize>,
    /// Last saved operation, `None` when nothing in the log is saved
    pub(crate) last_saved_operation_index: Option<usize>,
}

impl EditionState {
    fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            operations: Vec::new(),
            last_operation_index: None,
            last_saved_operation_index: None,
        }
    }

    /// Materialized workspace
    #[inline]
    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Operation log
    #[inline]
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Id of the operation at the cursor
    #[must_use]
    pub fn tip_id(&self) -> Option<&OperationId> {
        self.last_operation_index
            .and_then(|i| self.operations.get(i))
            .and_then(|op| op.id.as_ref())
    }

    /// Cursor as an external index, `-1` for the pristine state
    #[must_use]
    pub fn cursor(&self) -> isize {
        to_external(self.last_operation_index)
    }

    /// Saved cursor as an external index
    #[must_use]
    pub fn saved_cursor(&self) -> isize {
        to_external(self.last_saved_operation_index)
    }

    /// Whether operations after the saved cursor are applied
    #[must_use]
    pub fn has_unsaved_operations(&self) -> bool {
        self.last_operation_index > self.last_saved_operation_index
    }

    /// Append an accepted operation after the cursor, dropping the redo tail
    ///
    /// Returns the operations removed from the tail.
    pub(crate) fn append(&mut self, operation: Operation) -> Vec<Operation> {
        let keep = self.last_operation_index.map_or(0, |i| i + 1);
        let discarded = self.operations.split_off(keep);
        self.operations.push(operation);
        self.last_operation_index = Some(self.operations.len() - 1);
        discarded
    }

    /// Drop the whole log after a successful save
    pub(crate) fn compact(&mut self) -> Vec<Operation> {
        self.last_operation_index = None;
        self.last_saved_operation_index = None;
        std::mem::take(&mut self.operations)
    }
}

#[allow(clippy::cast_possible_wrap)]
fn to_external(index: Option<usize>) -> isize {
    index.map_or(-1, |i| i as isize)
}

/// Per-document edition state shared by every call on the document
#[derive(Debug)]
pub struct EditionContext {
    id: DocumentId,
    working_dir: PathBuf,
    canonical_path: ArchivePath,
    current_operation: Mutex<Option<OperationId>>,
    state: Mutex<EditionState>,
}

impl EditionContext {
    /// Load a context: read the document, materialize its working tree and
    /// write the canonical file there if it is missing
    ///
    /// # Errors
    /// Propagates store, version control and filesystem failures
    pub fn load(id: &DocumentId, services: &EditorServices, config: &EditorConfig) -> EditorResult<Self> {
        let mut document = services.documents.get_or_fail(id)?;
        let canonical_path = canonical_path_of(&mut document, config)?;
        let working_dir = services.version_control.init_working_tree(id)?;

        let canonical_file = working_dir.join(canonical_path.to_relative_path());
        if !canonical_file.exists() {
            let bytes = services.codec.serialize(&document)?;
            if let Some(parent) = canonical_file.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| EditorError::io(format!("creating {}", parent.display()), e))?;
            }
            std::fs::write(&canonical_file, bytes)
                .map_err(|e| EditorError::io(format!("writing {}", canonical_file.display()), e))?;
            tracing::debug!(document = %id, path = %canonical_path, "canonical file written");
        }

        let tree = scan(&working_dir)?;
        tracing::debug!(document = %id, elements = document.elements.len(), "edition context loaded");
        Ok(Self {
            id: id.clone(),
            working_dir,
            canonical_path,
            current_operation: Mutex::new(None),
            state: Mutex::new(EditionState::new(Workspace { document, tree })),
        })
    }

    #[cfg(test)]
    pub(crate) fn detached(document: Document) -> Self {
        Self {
            id: document.id.clone(),
            working_dir: PathBuf::new(),
            canonical_path: "topology.yaml".parse().unwrap(),
            current_operation: Mutex::new(None),
            state: Mutex::new(EditionState::new(Workspace {
                document,
                tree: FileTree::new(),
            })),
        }
    }

    /// Document id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// Working tree directory
    #[inline]
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Archive path of the canonical document file
    #[inline]
    #[must_use]
    pub fn canonical_path(&self) -> &ArchivePath {
        &self.canonical_path
    }

    /// Operation currently in flight, if any
    #[must_use]
    pub fn current_operation(&self) -> Option<OperationId> {
        self.current_operation.lock().clone()
    }

    pub(crate) fn marker(&self) -> MutexGuard<'_, Option<OperationId>> {
        self.current_operation.lock()
    }

    /// Lock the state
    pub fn state(&self) -> MutexGuard<'_, EditionState> {
        self.state.lock()
    }

    /// Workspace as of the last save: authoritative record plus working tree
    ///
    /// # Errors
    /// Propagates store and filesystem failures
    pub fn pristine(&self, services: &EditorServices, config: &EditorConfig) -> EditorResult<Workspace> {
        let mut document = services.documents.get_or_fail(&self.id)?;
        canonical_path_of(&mut document, config)?;
        Ok(Workspace {
            document,
            tree: scan(&self.working_dir)?,
        })
    }

    /// Delete the staged artifacts of every logged operation
    ///
    /// Failures are logged and skipped.
    pub fn cleanup(&self, artifacts: &dyn ArtifactStore) {
        let state = self.state.lock();
        delete_staged(&self.id, &state.operations, artifacts);
    }
}

/// Delete the staged artifacts held by `operations`, logging failures
pub(crate) fn delete_staged(id: &DocumentId, operations: &[Operation], artifacts: &dyn ArtifactStore) {
    for staged in operations.iter().filter_map(Operation::staged_artifact) {
        if !artifacts.exists(staged) {
            continue;
        }
        if let Err(e) = artifacts.delete(staged) {
            tracing::warn!(document = %id, artifact = %staged, error = %e, "failed to delete staged artifact");
        }
    }
}

fn canonical_path_of(document: &mut Document, config: &EditorConfig) -> EditorResult<ArchivePath> {
    let raw = document
        .canonical_path
        .get_or_insert_with(|| config.canonical_file_name.clone());
    Ok(raw.parse()?)
}

fn scan(dir: &Path) -> EditorResult<FileTree> {
    FileTree::scan(dir).map_err(|e| EditorError::io(format!("scanning {}", dir.display()), e))
}
