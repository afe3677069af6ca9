//! Collaborators consumed by the engine
//!
//! The engine never reaches for global state: every processor and pipeline
//! step receives an [`EditorServices`] bundle and calls through these traits.
//! Default in-process implementations live in sibling modules.

use crate::error::{ConstraintError, EditorError, EditorResult, ParseError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use topo_model::{
    ArtifactId, Dependency, Document, DocumentId, Element, PropertyDefinition, PropertyValue,
    TypeDescriptor, TypeId,
};

/// Caller identity checked by the [`Authorizer`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Principal {
    /// Principal with no roles
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: BTreeSet::new(),
        }
    }

    /// With an additional role
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }
}

/// One entry of a document's version history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub commit_id: String,
    pub author: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Authoritative document record
pub trait DocumentStore: Send + Sync {
    /// Load a document, failing with `NotFound` when it does not exist
    fn get_or_fail(&self, id: &DocumentId) -> EditorResult<Document>;

    /// Persist the authoritative record
    fn save(&self, document: &Document) -> EditorResult<()>;

    /// Refresh any derived / searchable index of the document
    fn update_derived_index(&self, document: &Document) -> EditorResult<()>;
}

/// Canonical file format of a document
pub trait DocumentCodec: Send + Sync {
    /// Parse canonical bytes
    fn parse(&self, bytes: &[u8]) -> Result<Document, ParseError>;

    /// Render the canonical bytes
    fn serialize(&self, document: &Document) -> EditorResult<Vec<u8>>;
}

/// Edit authorization policy
pub trait Authorizer: Send + Sync {
    /// Fail with `AccessDenied` unless `principal` may edit `document`
    fn check_edit_authorization(&self, principal: &Principal, document: &Document)
        -> EditorResult<()>;

    /// Fail unless the document is in a mutable version state
    fn throw_if_immutable(&self, document: &Document) -> EditorResult<()> {
        if document.is_released() {
            return Err(EditorError::Released(document.id.clone()));
        }
        Ok(())
    }
}

/// Constraint-checked property assignment
pub trait PropertyValueService: Send + Sync {
    /// Coerce `value` to the definition's type, check its constraints and
    /// store it under `name`. Nothing is written on failure.
    fn set_property_value(
        &self,
        properties: &mut BTreeMap<String, PropertyValue>,
        name: &str,
        definition: &PropertyDefinition,
        value: PropertyValue,
    ) -> Result<(), ConstraintError>;
}

/// Type descriptors and cross-document composition bookkeeping
pub trait TypeCatalog: Send + Sync {
    /// Resolve a type descriptor
    fn resolve(&self, id: &TypeId) -> Option<TypeDescriptor>;

    /// Whether composing `candidate` into `document` would make the document
    /// contain itself, directly or through other substituted documents
    fn detect_cyclic_composition(&self, document: &DocumentId, candidate: &TypeDescriptor) -> bool;

    /// Documents other than `excluding` that depend on `archive`
    fn dependents(&self, archive: &Dependency, excluding: &DocumentId) -> Vec<DocumentId>;

    /// Record a saved document: its dependencies, the documents it composes,
    /// and the substitution type it exposes (if any)
    fn publish(&self, document: &Document) -> EditorResult<()>;
}

/// Workflow bookkeeping triggered by structural changes
pub trait WorkflowHook: Send + Sync {
    fn on_element_added(&self, document: &DocumentId, element: &Element);

    fn on_element_removed(&self, document: &DocumentId, element: &Element);
}

/// Per-document version-controlled working tree
pub trait VersionControl: Send + Sync {
    /// Materialize the working directory of `id`, returning its path
    fn init_working_tree(&self, id: &DocumentId) -> EditorResult<PathBuf>;

    /// Commit every change of the working tree
    fn commit(&self, id: &DocumentId, author: &str, message: &str) -> EditorResult<()>;

    /// Newest-first page of the history
    fn history(&self, id: &DocumentId, from: usize, count: usize) -> EditorResult<Vec<HistoryEntry>>;
}

/// Temporary storage for uploaded byte streams
pub trait ArtifactStore: Send + Sync {
    fn store(&self, content: &[u8]) -> EditorResult<ArtifactId>;

    fn get(&self, id: &ArtifactId) -> EditorResult<Vec<u8>>;

    fn delete(&self, id: &ArtifactId) -> EditorResult<()>;

    fn exists(&self, id: &ArtifactId) -> bool;
}

/// Workflow hook that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingWorkflow;

impl WorkflowHook for LoggingWorkflow {
    fn on_element_added(&self, document: &DocumentId, element: &Element) {
        tracing::debug!(document = %document, element = %element.name, "element added");
    }

    fn on_element_removed(&self, document: &DocumentId, element: &Element) {
        tracing::debug!(document = %document, element = %element.name, "element removed");
    }
}

/// Every collaborator the engine calls
#[derive(Clone)]
pub struct EditorServices {
    pub documents: Arc<dyn DocumentStore>,
    pub codec: Arc<dyn DocumentCodec>,
    pub authorizer: Arc<dyn Authorizer>,
    pub values: Arc<dyn PropertyValueService>,
    pub catalog: Arc<dyn TypeCatalog>,
    pub workflow: Arc<dyn WorkflowHook>,
    pub version_control: Arc<dyn VersionControl>,
    pub artifacts: Arc<dyn ArtifactStore>,
}

impl std::fmt::Debug for EditorServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorServices").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AllowAll;

    impl Authorizer for AllowAll {
        fn check_edit_authorization(&self, _: &Principal, _: &Document) -> EditorResult<()> {
            Ok(())
        }
    }

    #[test]
    fn released_documents_are_immutable_by_default() {
        let released = Document::new("d", "web", "1.0.0");
        let err = AllowAll.throw_if_immutable(&released).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Immutable);

        let snapshot = Document::new("d", "web", "1.0.0-SNAPSHOT");
        assert!(AllowAll.throw_if_immutable(&snapshot).is_ok());
    }

    #[test]
    fn principal_builder_collects_roles() {
        let p = Principal::new("alice").with_role("ADMIN").with_role("ADMIN");
        assert_eq!(p.roles.len(), 1);
    }
}
