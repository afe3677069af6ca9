//! Topology edition engine
//!
//! Versioned, operation-sourced editing of topology documents. Every edit is
//! an [`Operation`] appended to a per-document log; the document state is the
//! result of replaying the log on top of the last saved version.
//!
//! # Core Concepts
//!
//! - [`EditorService`]: entry points (execute, undo/redo, save, history)
//! - [`EditionContextCache`]: one [`EditionContext`] per document, evicted
//!   when idle
//! - [`Session`]: binds a call to a context and guards it against
//!   concurrent edits
//! - [`ProcessorRegistry`]: one [`OperationProcessor`] per [`OperationKind`]
//! - [`EditorServices`]: the collaborators the engine delegates to
//!
//! # Example
//!
//! ```rust,ignore
//! use topo_editor::{EditorConfig, EditorService, Operation, OperationPayload, Principal};
//!
//! let editor = EditorService::new(EditorConfig::default(), services)?;
//! let user = Principal::new("alice").with_role(topo_editor::EDITOR_ROLE);
//! let snapshot = editor.execute(
//!     &user,
//!     &"doc-1".into(),
//!     Operation::new(OperationPayload::AddElement {
//!         name: "Server".into(),
//!         type_id: "Compute:1.0".into(),
//!     }),
//! )?;
//! editor.save(&user, &"doc-1".into(), snapshot.last_operation_id.as_ref())?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod artifacts;
mod auth;
mod cache;
mod catalog;
mod codec;
mod config;
mod context;
mod editor;
mod error;
mod git;
mod journal;
mod operation;
pub mod processors;
mod services;
mod session;
mod snapshot;
mod store;
pub mod telemetry;
mod values;

pub use artifacts::LocalArtifactStore;
pub use auth::{RoleAuthorizer, ADMIN_ROLE, EDITOR_ROLE};
pub use cache::{CacheStats, EditionContextCache};
pub use catalog::InMemoryTypeCatalog;
pub use codec::YamlDocumentCodec;
pub use config::{CommitIdentity, EditorConfig};
pub use context::{EditionContext, EditionState, Workspace};
pub use editor::{CallPhase, EditorService};
pub use error::{ConstraintError, EditorError, EditorResult, ErrorKind, ParseError, RegistryError};
pub use git::GitWorkingTree;
pub use journal::SaveJournal;
pub use operation::{FileUpload, Operation, OperationKind, OperationPayload};
pub use processors::{OperationProcessor, ProcessorRegistry};
pub use services::{
    ArtifactStore, Authorizer, DocumentCodec, DocumentStore, EditorServices, HistoryEntry, LoggingWorkflow,
    Principal, PropertyValueService, TypeCatalog, VersionControl, WorkflowHook,
};
pub use session::{Claim, Session};
pub use snapshot::{OperationSummary, Snapshot};
pub use store::{FsDocumentStore, IndexEntry, MemoryDocumentStore};
pub use values::{coerce, ConstraintValueService};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
