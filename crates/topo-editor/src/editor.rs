//! Edit orchestrator
//!
//! [`EditorService`] is the exposed surface of the engine. Every entry point
//! binds a [`Session`] for the target document and releases it on return,
//! whatever the outcome. Mutating entry points additionally hold a
//! [`Claim`](crate::session::Claim) for their whole duration.
//!
//! The state lock is only taken to read the log and to publish the result.
//! Processing, replay and persistence run on copies with the lock released,
//! so a concurrent call finds the in-flight marker and fails at once.
//!
//! # Call lifecycle
//!
//! ```text
//! Idle -> AuthChecked -> LockChecked -> Dispatched -> Logged -> Released
//! ```
//!
//! The log and cursors only change once processing has succeeded.

use crate::cache::EditionContextCache;
use crate::config::EditorConfig;
use crate::context::{delete_staged, EditionContext, EditionState};
use crate::error::{EditorError, EditorResult};
use crate::journal::SaveJournal;
use crate::operation::Operation;
use crate::processors::{CommitScope, EditScope, ProcessorRegistry};
use crate::services::{EditorServices, HistoryEntry, Principal};
use crate::session::Session;
use crate::snapshot::Snapshot;
use std::sync::Arc;
use topo_model::{ArchivePath, Document, DocumentId, OperationId};
use tracing::{debug, error, info, warn};

/// Phase of an orchestrated call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Idle,
    AuthChecked,
    LockChecked,
    Dispatched,
    Logged,
    Released,
}

#[inline]
fn enter(phase: CallPhase) {
    debug!(?phase, "call phase");
}

/// How far a save got before failing
#[derive(Debug, Default)]
struct SaveProgress {
    record_written: bool,
}

/// The edition engine
#[derive(Debug)]
pub struct EditorService {
    config: Arc<EditorConfig>,
    services: EditorServices,
    registry: ProcessorRegistry,
    cache: EditionContextCache,
}

impl EditorService {
    /// Engine with the built-in processors
    ///
    /// # Errors
    /// Returns error if the processor registry is inconsistent
    pub fn new(config: EditorConfig, services: EditorServices) -> EditorResult<Self> {
        Ok(Self::with_registry(config, services, ProcessorRegistry::with_defaults()?))
    }

    /// Engine with a custom processor registry
    #[must_use]
    pub fn with_registry(config: EditorConfig, services: EditorServices, registry: ProcessorRegistry) -> Self {
        let config = Arc::new(config);
        let cache = EditionContextCache::new(Arc::clone(&config), services.clone());
        Self {
            config,
            services,
            registry,
            cache,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn services(&self) -> &EditorServices {
        &self.services
    }

    #[inline]
    #[must_use]
    pub fn cache(&self) -> &EditionContextCache {
        &self.cache
    }

    fn authorize(&self, state: &EditionState, principal: &Principal) -> EditorResult<()> {
        let document = &state.workspace().document;
        self.services.authorizer.check_edit_authorization(principal, document)?;
        self.services.authorizer.throw_if_immutable(document)?;
        enter(CallPhase::AuthChecked);
        Ok(())
    }

    fn scope<'a>(
        &'a self,
        context: &'a EditionContext,
        workspace: &'a mut crate::context::Workspace,
    ) -> EditScope<'a> {
        EditScope {
            document_id: context.id(),
            canonical_path: context.canonical_path(),
            workspace,
            services: &self.services,
        }
    }

    /// Apply one operation on top of the current cursor
    ///
    /// `operation.previous_operation_id` must name the operation at the
    /// cursor (absent when the cursor is at the pristine state). On success
    /// any redo tail is discarded and the operation becomes the new tip.
    ///
    /// # Errors
    /// Authorization, concurrency and processor errors; none of them change
    /// the log or the document
    #[tracing::instrument(skip_all, fields(document = %id, kind = %operation.kind()))]
    pub fn execute(&self, principal: &Principal, id: &DocumentId, mut operation: Operation) -> EditorResult<Snapshot> {
        enter(CallPhase::Idle);
        if operation.staged_artifact().is_some() {
            return Err(EditorError::Validation(
                "staged artifact references are assigned by the editor".into(),
            ));
        }
        let session = Session::init(&self.cache, id)?;
        let context = session.context();
        self.authorize(&context.state(), principal)?;

        let operation_id = OperationId::generate();
        let claim = session.claim(operation.previous_operation_id.as_ref(), operation_id.clone())?;
        enter(CallPhase::LockChecked);
        operation.id = Some(operation_id);
        operation.author = Some(principal.user_id.clone());

        let mut draft = context.state().workspace().clone();
        self.registry
            .get(operation.kind())
            .process(&mut self.scope(context, &mut draft), &mut operation)?;
        enter(CallPhase::Dispatched);

        let mut state = context.state();
        state.workspace = draft;
        let discarded = state.append(operation);
        if !discarded.is_empty() {
            debug!(dropped = discarded.len(), "redo tail discarded");
            delete_staged(id, &discarded, self.services.artifacts.as_ref());
        }
        enter(CallPhase::Logged);

        let snapshot = Snapshot::capture(id, &state)?;
        drop(state);
        drop(claim);
        session.destroy();
        enter(CallPhase::Released);
        Ok(snapshot)
    }

    /// Move the cursor to `index` (`-1` for the pristine state) by
    /// replaying the log from the pristine state
    ///
    /// # Errors
    /// `NotFound` for an index outside the log, `Concurrency` on a stale
    /// `expected_last`, or the replay failure; on failure the document,
    /// log and cursor are left as they were
    #[tracing::instrument(skip(self, principal, id, expected_last), fields(document = %id))]
    pub fn undo_redo(
        &self,
        principal: &Principal,
        id: &DocumentId,
        index: isize,
        expected_last: Option<&OperationId>,
    ) -> EditorResult<Snapshot> {
        let session = Session::init(&self.cache, id)?;
        let context = session.context();
        self.authorize(&context.state(), principal)?;
        let _claim = session.claim(expected_last, OperationId::generate())?;

        let (target, mut replayed) = {
            let state = context.state();
            let target = log_index(index, state.operations().len())?;
            if target == state.last_operation_index {
                return Snapshot::capture(id, &state);
            }
            let prefix = target.map_or_else(Vec::new, |last| state.operations()[..=last].to_vec());
            (target, prefix)
        };

        let mut draft = context.pristine(&self.services, &self.config)?;
        for operation in &mut replayed {
            let processor = self.registry.get(operation.kind());
            if let Err(e) = processor.process(&mut self.scope(context, &mut draft), operation) {
                warn!(error = %e, operation = ?operation.id, "replay failed");
                return Err(e);
            }
        }

        let mut state = context.state();
        debug!(from = state.cursor(), to = ?target, "log replayed");
        state.operations[..replayed.len()].clone_from_slice(&replayed);
        state.workspace = draft;
        state.last_operation_index = target;
        Snapshot::capture(id, &state)
    }

    /// Commit every unsaved operation up to the cursor
    ///
    /// Promotes staged uploads into the working tree, writes the canonical
    /// file, persists the record and derived index, publishes the document
    /// to the type catalog and makes one commit. On success the whole log
    /// is dropped. On failure every step is undone and the cursors stay put,
    /// so the call can be retried.
    ///
    /// # Errors
    /// Authorization, concurrency, IO and version-control errors
    #[tracing::instrument(skip_all, fields(document = %id))]
    pub fn save(&self, principal: &Principal, id: &DocumentId, expected_last: Option<&OperationId>) -> EditorResult<Snapshot> {
        let session = Session::init(&self.cache, id)?;
        let context = session.context();
        self.authorize(&context.state(), principal)?;
        let _claim = session.claim(expected_last, OperationId::generate())?;

        let (operations, document) = {
            let state = context.state();
            let Some(last) = state.last_operation_index.filter(|_| state.has_unsaved_operations()) else {
                debug!("nothing to save");
                return Snapshot::capture(id, &state);
            };
            let first = state.last_saved_operation_index.map_or(0, |i| i + 1);
            (state.operations()[first..=last].to_vec(), state.workspace().document.clone())
        };

        let previous_record = self.services.documents.get_or_fail(id)?;
        let mut journal = SaveJournal::new(context.working_dir());
        let mut progress = SaveProgress::default();
        if let Err(e) = self.persist(context, &operations, &document, principal, &mut journal, &mut progress) {
            error!(error = %e, "save failed, rolling back");
            if let Err(restore) = journal.rollback() {
                error!(error = %restore, "working tree rollback incomplete");
            }
            if progress.record_written {
                self.restore_record(&previous_record);
            }
            return Err(e);
        }

        let mut state = context.state();
        let artifacts = self.services.artifacts.as_ref();
        for (path, artifact) in journal.promoted() {
            if let Err(e) = artifacts.delete(artifact) {
                warn!(%path, error = %e, "failed to delete promoted artifact");
            }
        }
        let staged: Vec<ArchivePath> = state
            .workspace()
            .tree
            .staged_files()
            .into_iter()
            .filter_map(|(path, _)| path.parse().ok())
            .collect();
        for path in &staged {
            state.workspace.tree.set_staged(path, None);
        }
        let dropped = state.compact();
        delete_staged(id, &dropped, artifacts);
        info!(operations = operations.len(), "document saved");
        Snapshot::capture(id, &state)
    }

    fn persist(
        &self,
        context: &EditionContext,
        operations: &[Operation],
        document: &Document,
        principal: &Principal,
        journal: &mut SaveJournal,
        progress: &mut SaveProgress,
    ) -> EditorResult<()> {
        let id = context.id();
        let mut lines = Vec::new();
        for operation in operations {
            let mut scope = CommitScope {
                document_id: id,
                canonical_path: context.canonical_path(),
                services: &self.services,
                journal: &mut *journal,
            };
            self.registry.get(operation.kind()).before_commit(&mut scope, operation)?;
            lines.push(operation.commit_line());
        }

        let bytes = self.services.codec.serialize(document)?;
        journal.write(context.canonical_path(), &bytes)?;

        progress.record_written = true;
        self.services.documents.save(document)?;
        self.services.documents.update_derived_index(document)?;
        self.services.catalog.publish(document)?;

        self.services
            .version_control
            .commit(id, &principal.user_id, &lines.join("\n"))?;
        Ok(())
    }

    fn restore_record(&self, previous: &Document) {
        let restored = self
            .services
            .documents
            .save(previous)
            .and_then(|()| self.services.documents.update_derived_index(previous))
            .and_then(|()| self.services.catalog.publish(previous));
        if let Err(e) = restored {
            error!(document = %previous.id, error = %e, "failed to restore previous record");
        }
    }

    /// Page of the document's version history, newest first
    ///
    /// # Errors
    /// Load and version-control errors
    #[tracing::instrument(skip(self, id), fields(document = %id))]
    pub fn history(&self, id: &DocumentId, from: usize, count: usize) -> EditorResult<Vec<HistoryEntry>> {
        let session = Session::init(&self.cache, id)?;
        let count = count.min(self.config.max_history_page);
        let history = self.services.version_control.history(id, from, count);
        session.destroy();
        history
    }

    /// Drop the edition context, discarding unsaved operations and their
    /// staged uploads; the next call reloads the saved state
    ///
    /// # Errors
    /// Authorization and concurrency errors
    #[tracing::instrument(skip_all, fields(document = %id))]
    pub fn reset(&self, principal: &Principal, id: &DocumentId, expected_last: Option<&OperationId>) -> EditorResult<()> {
        let session = Session::init(&self.cache, id)?;
        {
            let state = session.context().state();
            self.services
                .authorizer
                .check_edit_authorization(principal, &state.workspace().document)?;
        }
        let claim = session.claim(expected_last, OperationId::generate())?;
        self.cache.invalidate(id);
        drop(claim);
        session.destroy();
        info!("edition context reset");
        Ok(())
    }

    /// Check that `principal` may edit the document
    ///
    /// # Errors
    /// `AccessDenied`, or load errors
    #[tracing::instrument(skip_all, fields(document = %id))]
    pub fn check_authorization(&self, principal: &Principal, id: &DocumentId) -> EditorResult<()> {
        let session = Session::init(&self.cache, id)?;
        let state = session.context().state();
        self.services
            .authorizer
            .check_edit_authorization(principal, &state.workspace().document)
    }

    /// Current state of the document
    ///
    /// # Errors
    /// Load errors
    pub fn snapshot(&self, id: &DocumentId) -> EditorResult<Snapshot> {
        let session = Session::init(&self.cache, id)?;
        let state = session.context().state();
        Snapshot::capture(id, &state)
    }
}

/// Map an external index (`-1` = pristine) onto the log
fn log_index(target: isize, len: usize) -> EditorResult<Option<usize>> {
    if target == -1 {
        return Ok(None);
    }
    usize::try_from(target)
        .ok()
        .filter(|&i| i < len)
        .map(Some)
        .ok_or_else(|| EditorError::NotFound(format!("operation index {target} (log holds {len})")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn log_index_bounds() {
        assert_eq!(log_index(-1, 0).unwrap(), None);
        assert_eq!(log_index(2, 3).unwrap(), Some(2));
        assert_eq!(log_index(3, 3).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(log_index(-2, 3).unwrap_err().kind(), ErrorKind::NotFound);
    }
}
