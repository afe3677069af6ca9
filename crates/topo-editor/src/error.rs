//! Error types for the edition engine
//!
//! Every failure surfaced by the engine is an [`EditorError`]. Callers that
//! only need the category (to pick a response code, or to decide whether a
//! retry makes sense) use [`EditorError::kind`].

use crate::operation::OperationKind;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use topo_model::{Constraint, DocumentId, FingerprintError, PathError, TreeError, ValueType};

/// Category of an [`EditorError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Concurrency,
    CyclicReference,
    ConstraintViolation,
    ReferencedObjectInUse,
    Io,
    ParsingFailure,
    AccessDenied,
    Immutable,
    Internal,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Concurrency => "concurrency",
            Self::CyclicReference => "cyclic_reference",
            Self::ConstraintViolation => "constraint_violation",
            Self::ReferencedObjectInUse => "referenced_object_in_use",
            Self::Io => "io",
            Self::ParsingFailure => "parsing_failure",
            Self::AccessDenied => "access_denied",
            Self::Immutable => "immutable",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// Missing document, element, relation, property, type or index
    #[error("not found: {0}")]
    NotFound(String),

    /// Element or relation name outside the allowed alphabet
    #[error(
        "invalid name <{0}>: a name should only contain alphanumeric characters from the basic Latin alphabet and the underscore"
    )]
    InvalidName(String),

    /// Name already taken
    #[error("name <{0}> is already used")]
    DuplicateName(String),

    /// Archive path that cannot hold a file
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Any other rejected input
    #[error("validation failed: {0}")]
    Validation(String),

    /// Stale lineage or a call already in flight on the document
    #[error("concurrent edition: {0}")]
    Concurrency(String),

    /// Composition that would make a document contain itself
    #[error("cyclic reference: {0}")]
    CyclicReference(String),

    /// Value rejected by the property value service
    #[error("invalid value <{value}> for property <{property}> of {owner}: {source}")]
    PropertyValue {
        owner: String,
        property: String,
        value: String,
        #[source]
        source: ConstraintError,
    },

    /// Object still referenced elsewhere
    #[error("referenced object in use: {0}")]
    ReferencedObjectInUse(String),

    /// Filesystem failure
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Version control failure
    #[error("version control failure: {0}")]
    Repository(String),

    /// Document could not be serialized
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Document bytes could not be parsed
    #[error("parsing failed: {0}")]
    Parsing(#[from] ParseError),

    /// Caller may not edit the document
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Released versions are read-only
    #[error("document <{0}> is released and cannot be modified")]
    Released(DocumentId),

    /// Processor table misconfiguration
    #[error("processor registry: {0}")]
    Registry(#[from] RegistryError),

    /// Invariant broken inside the engine
    #[error("internal error: {0}")]
    Internal(String),

    /// Error shared between concurrent callers of the context loader
    #[error(transparent)]
    Shared(Arc<EditorError>),
}

impl EditorError {
    /// Category of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidName(_)
            | Self::DuplicateName(_)
            | Self::InvalidPath(_)
            | Self::Validation(_) => ErrorKind::Validation,
            Self::Concurrency(_) => ErrorKind::Concurrency,
            Self::CyclicReference(_) => ErrorKind::CyclicReference,
            Self::PropertyValue { .. } => ErrorKind::ConstraintViolation,
            Self::ReferencedObjectInUse(_) => ErrorKind::ReferencedObjectInUse,
            Self::Io { .. } | Self::Repository(_) | Self::Serialization(_) => ErrorKind::Io,
            Self::Parsing(_) => ErrorKind::ParsingFailure,
            Self::AccessDenied(_) => ErrorKind::AccessDenied,
            Self::Released(_) => ErrorKind::Immutable,
            Self::Registry(_) | Self::Internal(_) => ErrorKind::Internal,
            Self::Shared(inner) => inner.kind(),
        }
    }

    /// Create IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create concurrency error
    pub fn concurrency(reason: impl Into<String>) -> Self {
        Self::Concurrency(reason.into())
    }

    /// Take back ownership of an error shared through the cache loader
    #[must_use]
    pub fn from_shared(shared: Arc<EditorError>) -> Self {
        Arc::try_unwrap(shared).unwrap_or_else(Self::Shared)
    }

    /// Whether retrying the same call can succeed without changing it
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Io)
    }
}

impl From<PathError> for EditorError {
    fn from(value: PathError) -> Self {
        Self::InvalidPath(value.to_string())
    }
}

impl From<TreeError> for EditorError {
    fn from(value: TreeError) -> Self {
        Self::InvalidPath(value.to_string())
    }
}

impl From<FingerprintError> for EditorError {
    fn from(value: FingerprintError) -> Self {
        Self::Internal(format!("fingerprint: {value}"))
    }
}

/// Rejections raised by the property value service
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConstraintError {
    /// Value cannot be coerced into the declared type
    #[error("expected a value of type {expected}")]
    TypeMismatch { expected: ValueType },

    /// Value violates a declared constraint
    #[error("value violates constraint '{0}'")]
    Violation(Constraint),

    /// Declared pattern is not a valid regular expression
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Errors from the document parser
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Bytes are not valid UTF-8
    #[error("document is not valid UTF-8")]
    Encoding,

    /// Syntax or structure error
    #[error("invalid document: {0}")]
    Syntax(String),
}

/// Errors raised while building the processor registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Two processors registered for one kind
    #[error("processor already registered for operation kind {0}")]
    Duplicate(OperationKind),

    /// Kind with no processor
    #[error("no processor registered for operation kind {0}")]
    Missing(OperationKind),
}

/// Result type alias for engine operations
pub type EditorResult<T> = Result<T, EditorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(EditorError::InvalidName("a-b".into()).kind(), ErrorKind::Validation);
        assert_eq!(EditorError::DuplicateName("a".into()).kind(), ErrorKind::Validation);
        assert_eq!(EditorError::Repository("x".into()).kind(), ErrorKind::Io);
        assert_eq!(
            EditorError::Released(DocumentId::new("d")).kind(),
            ErrorKind::Immutable
        );
        assert_eq!(
            EditorError::Parsing(ParseError::Encoding).kind(),
            ErrorKind::ParsingFailure
        );
    }

    #[test]
    fn shared_errors_report_inner_kind() {
        let shared = Arc::new(EditorError::NotFound("doc".into()));
        let keep_alive = Arc::clone(&shared);
        let err = EditorError::from_shared(shared);
        assert!(matches!(err, EditorError::Shared(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        drop(keep_alive);
    }

    #[test]
    fn unique_shared_errors_are_unwrapped() {
        let err = EditorError::from_shared(Arc::new(EditorError::NotFound("doc".into())));
        assert!(matches!(err, EditorError::NotFound(_)));
    }

    #[test]
    fn property_error_names_field_and_value() {
        let err = EditorError::PropertyValue {
            owner: "relation Server.hostedOn".into(),
            property: "port".into(),
            value: "0".into(),
            source: ConstraintError::Violation(Constraint::GreaterOrEqual(1.0)),
        };
        let msg = err.to_string();
        assert!(msg.contains("port"));
        assert!(msg.contains("<0>"));
        assert!(msg.contains("greater_or_equal 1"));
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    }

    #[test]
    fn path_errors_are_validation_failures() {
        let err: EditorError = PathError::DirectoryPath("a/".into()).into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.is_retryable());
    }
}
