//! Operation processors
//!
//! One [`OperationProcessor`] per [`OperationKind`]. The [`ProcessorRegistry`]
//! is validated when it is built: a kind without a processor, or with two,
//! fails there rather than at first dispatch.
//!
//! Processors work on an [`EditScope`] whose workspace is a draft copy. The
//! orchestrator swaps the draft in only when processing succeeds, so a
//! failing processor never leaves a partial edit behind. Processing must be
//! deterministic: undo/redo replays logged operations verbatim.

mod element;
mod file;
mod property;
mod relation;
mod substitution;
mod types;

pub use element::{AddElementProcessor, RemoveElementProcessor};
pub use file::{UpdateCanonicalDocumentProcessor, UpdateFileProcessor};
pub use property::{UpdateElementPropertyProcessor, UpdateRelationPropertyProcessor};
pub use relation::AddRelationProcessor;
pub use substitution::{RemoveSubstitutionProcessor, SetSubstitutionProcessor};

use crate::context::Workspace;
use crate::error::{EditorResult, RegistryError};
use crate::journal::SaveJournal;
use crate::operation::{Operation, OperationKind};
use crate::services::EditorServices;
use std::fmt::Debug;
use topo_model::{ArchivePath, DocumentId};

/// What a processor sees while processing an operation
pub struct EditScope<'a> {
    pub document_id: &'a DocumentId,
    pub canonical_path: &'a ArchivePath,
    pub workspace: &'a mut Workspace,
    pub services: &'a EditorServices,
}

/// What a processor sees while finalizing an operation at save time
pub struct CommitScope<'a> {
    pub document_id: &'a DocumentId,
    pub canonical_path: &'a ArchivePath,
    pub services: &'a EditorServices,
    pub journal: &'a mut SaveJournal,
}

/// Applies one operation kind to a workspace
pub trait OperationProcessor: Send + Sync + Debug {
    /// Kind this processor handles
    fn kind(&self) -> OperationKind;

    /// Apply `operation` to the scope's workspace
    ///
    /// # Errors
    /// Any domain error; the caller discards the workspace on failure
    fn process(&self, scope: &mut EditScope<'_>, operation: &mut Operation) -> EditorResult<()>;

    /// Finalize deferred effects when the operation is saved
    ///
    /// Called once per saved operation, in log order.
    ///
    /// # Errors
    /// Filesystem failures; the save is rolled back
    fn before_commit(&self, _scope: &mut CommitScope<'_>, _operation: &Operation) -> EditorResult<()> {
        Ok(())
    }
}

/// Dispatch table from operation kind to processor
#[derive(Debug)]
pub struct ProcessorRegistry {
    table: Vec<Box<dyn OperationProcessor>>,
}

impl ProcessorRegistry {
    /// Build a registry, rejecting missing and duplicate kinds
    ///
    /// # Errors
    /// [`RegistryError::Duplicate`] or [`RegistryError::Missing`]
    pub fn build(processors: Vec<Box<dyn OperationProcessor>>) -> Result<Self, RegistryError> {
        let mut slots: Vec<Option<Box<dyn OperationProcessor>>> =
            OperationKind::ALL.iter().map(|_| None).collect();
        for processor in processors {
            let kind = processor.kind();
            let slot = &mut slots[kind.index()];
            if slot.is_some() {
                return Err(RegistryError::Duplicate(kind));
            }
            *slot = Some(processor);
        }
        let table = slots
            .into_iter()
            .zip(OperationKind::ALL)
            .map(|(slot, kind)| slot.ok_or(RegistryError::Missing(kind)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { table })
    }

    /// Registry with the built-in processor of every kind
    ///
    /// # Errors
    /// Only if the built-in set is inconsistent
    pub fn with_defaults() -> Result<Self, RegistryError> {
        Self::build(vec![
            Box::new(AddElementProcessor),
            Box::new(RemoveElementProcessor),
            Box::new(AddRelationProcessor),
            Box::new(UpdateElementPropertyProcessor),
            Box::new(UpdateRelationPropertyProcessor),
            Box::new(SetSubstitutionProcessor),
            Box::new(RemoveSubstitutionProcessor),
            Box::new(UpdateFileProcessor),
            Box::new(UpdateCanonicalDocumentProcessor),
        ])
    }

    /// Processor for `kind`
    #[inline]
    #[must_use]
    pub fn get(&self, kind: OperationKind) -> &dyn OperationProcessor {
        self.table[kind.index()].as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_kind() {
        let registry = ProcessorRegistry::with_defaults().unwrap();
        for kind in OperationKind::ALL {
            assert_eq!(registry.get(kind).kind(), kind);
        }
    }

    #[test]
    fn missing_kind_fails_at_build() {
        let err = ProcessorRegistry::build(vec![Box::new(AddElementProcessor)]).unwrap_err();
        assert_eq!(err, RegistryError::Missing(OperationKind::RemoveElement));
    }

    #[test]
    fn duplicate_kind_fails_at_build() {
        let err = ProcessorRegistry::build(vec![
            Box::new(AddElementProcessor),
            Box::new(AddElementProcessor),
        ])
        .unwrap_err();
        assert_eq!(err, RegistryError::Duplicate(OperationKind::AddElement));
    }
}
