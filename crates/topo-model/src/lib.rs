//! Topology document model
//!
//! The data the edition engine works on.
//!
//! # Core Concepts
//!
//! - [`Document`]: graph of named [`Element`]s linked by [`Relation`]s
//! - [`TypeDescriptor`]: property definitions and capabilities of a type
//! - [`ArchivePath`]: logical location of a file inside a document archive
//! - [`FileTree`]: virtual mirror of the document's working tree
//! - [`Fingerprint`]: Blake3 digest used to compare document states
//!
//! # Example
//!
//! ```rust
//! use topo_model::{Document, Element};
//!
//! let mut doc = Document::new("doc-1", "web", "1.0.0-SNAPSHOT");
//! doc.elements.insert("Server".into(), Element::new("Server", "Compute:1.0"));
//! assert!(!doc.is_released());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod document;
mod fingerprint;
mod ids;
mod path;
mod tree;
mod types;

pub use document::{is_valid_name, Document, Element, Relation, SubstitutionDescriptor, SNAPSHOT_SUFFIX};
pub use fingerprint::{Fingerprint, FingerprintError};
pub use ids::{ArtifactId, DocumentId, OperationId, TypeId};
pub use path::{ArchivePath, PathError};
pub use tree::{FileNode, FileTree, TreeError};
pub use types::{
    Constraint, Dependency, PropertyDefinition, PropertyValue, TypeDescriptor, TypeKind, ValueType,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
