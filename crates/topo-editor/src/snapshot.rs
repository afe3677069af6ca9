//! Response payload describing the current edition state

use crate::context::EditionState;
use crate::error::EditorResult;
use crate::operation::{Operation, OperationKind};
use serde::{Deserialize, Serialize};
use topo_model::{Document, DocumentId, FileTree, Fingerprint, OperationId};

/// Logged operation as shown to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSummary {
    pub id: Option<OperationId>,
    pub author: Option<String>,
    pub kind: OperationKind,
    pub message: String,
}

impl From<&Operation> for OperationSummary {
    fn from(op: &Operation) -> Self {
        Self {
            id: op.id.clone(),
            author: op.author.clone(),
            kind: op.kind(),
            message: op.payload.commit_message(),
        }
    }
}

/// Document, tree, log and cursors at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub document_id: DocumentId,
    pub document: Document,
    pub tree: FileTree,
    pub operations: Vec<OperationSummary>,
    pub last_operation_index: isize,
    pub last_saved_operation_index: isize,
    /// Id to send as `previous_operation_id` with the next call
    pub last_operation_id: Option<OperationId>,
    pub fingerprint: Fingerprint,
}

impl Snapshot {
    /// Capture the state of a locked context
    ///
    /// # Errors
    /// Returns error if the document cannot be fingerprinted
    pub fn capture(id: &DocumentId, state: &EditionState) -> EditorResult<Self> {
        let document = state.workspace().document.clone();
        Ok(Self {
            document_id: id.clone(),
            fingerprint: document.fingerprint()?,
            document,
            tree: state.workspace().tree.clone(),
            operations: state.operations().iter().map(OperationSummary::from).collect(),
            last_operation_index: state.cursor(),
            last_saved_operation_index: state.saved_cursor(),
            last_operation_id: state.tip_id().cloned(),
        })
    }
}
