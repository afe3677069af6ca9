//! Edit operations
//!
//! An [`Operation`] is one atomic, replayable edit. The engine assigns its id
//! when it is accepted; from then on the payload never changes except for the
//! staged artifact reference recorded the first time a file upload is
//! processed.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{self, Debug, Display, Formatter};
use topo_model::{ArtifactId, OperationId, PropertyValue, TypeId};

/// Every operation kind the engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    AddElement,
    RemoveElement,
    AddRelation,
    UpdateElementProperty,
    UpdateRelationProperty,
    SetSubstitution,
    RemoveSubstitution,
    UpdateFile,
    UpdateCanonicalDocument,
}

impl OperationKind {
    /// All kinds, in dispatch-table order
    pub const ALL: [OperationKind; 9] = [
        Self::AddElement,
        Self::RemoveElement,
        Self::AddRelation,
        Self::UpdateElementProperty,
        Self::UpdateRelationProperty,
        Self::SetSubstitution,
        Self::RemoveSubstitution,
        Self::UpdateFile,
        Self::UpdateCanonicalDocument,
    ];

    /// Slot of this kind in the dispatch table
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stable snake_case name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AddElement => "add_element",
            Self::RemoveElement => "remove_element",
            Self::AddRelation => "add_relation",
            Self::UpdateElementProperty => "update_element_property",
            Self::UpdateRelationProperty => "update_relation_property",
            Self::SetSubstitution => "set_substitution",
            Self::RemoveSubstitution => "remove_substitution",
            Self::UpdateFile => "update_file",
            Self::UpdateCanonicalDocument => "update_canonical_document",
        }
    }
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Byte stream uploaded with a file operation
///
/// The content is consumed the first time the operation is processed; after
/// that only the staged artifact id remains, so replaying the operation reads
/// the staged copy instead of the original stream.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct FileUpload {
    #[serde(default, skip_serializing, deserialize_with = "text_content")]
    content: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    staged: Option<ArtifactId>,
}

impl FileUpload {
    /// Upload carrying `content`
    #[must_use]
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: Some(content.into()),
            staged: None,
        }
    }

    /// Take the not-yet-staged content, leaving nothing behind
    pub fn take_content(&mut self) -> Option<Vec<u8>> {
        self.content.take()
    }

    /// Staged artifact holding the content, once staged
    #[inline]
    #[must_use]
    pub fn staged(&self) -> Option<&ArtifactId> {
        self.staged.as_ref()
    }

    /// Record the staged artifact
    pub fn set_staged(&mut self, id: ArtifactId) {
        self.staged = Some(id);
    }
}

impl Debug for FileUpload {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("pending_bytes", &self.content.as_ref().map(Vec::len))
            .field("staged", &self.staged)
            .finish()
    }
}

fn text_content<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(String::into_bytes))
}

/// Kind-specific operation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationPayload {
    AddElement {
        name: String,
        #[serde(rename = "element_type")]
        type_id: TypeId,
    },
    RemoveElement {
        name: String,
    },
    AddRelation {
        element: String,
        name: String,
        #[serde(rename = "relation_type")]
        type_id: TypeId,
        target: String,
        capability: String,
    },
    UpdateElementProperty {
        element: String,
        property: String,
        value: PropertyValue,
    },
    UpdateRelationProperty {
        element: String,
        relation: String,
        property: String,
        value: PropertyValue,
    },
    SetSubstitution {
        #[serde(rename = "element_type")]
        type_id: TypeId,
    },
    RemoveSubstitution,
    UpdateFile {
        path: String,
        #[serde(default)]
        upload: FileUpload,
    },
    UpdateCanonicalDocument {
        #[serde(default)]
        upload: FileUpload,
    },
}

impl OperationPayload {
    /// Kind used for dispatch
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::AddElement { .. } => OperationKind::AddElement,
            Self::RemoveElement { .. } => OperationKind::RemoveElement,
            Self::AddRelation { .. } => OperationKind::AddRelation,
            Self::UpdateElementProperty { .. } => OperationKind::UpdateElementProperty,
            Self::UpdateRelationProperty { .. } => OperationKind::UpdateRelationProperty,
            Self::SetSubstitution { .. } => OperationKind::SetSubstitution,
            Self::RemoveSubstitution => OperationKind::RemoveSubstitution,
            Self::UpdateFile { .. } => OperationKind::UpdateFile,
            Self::UpdateCanonicalDocument { .. } => OperationKind::UpdateCanonicalDocument,
        }
    }

    /// One-line description used in commit messages
    #[must_use]
    pub fn commit_message(&self) -> String {
        match self {
            Self::AddElement { name, type_id } => {
                format!("add element <{name}> of type <{type_id}>")
            }
            Self::RemoveElement { name } => format!("remove element <{name}>"),
            Self::AddRelation {
                element,
                name,
                target,
                capability,
                ..
            } => format!("add relation <{name}> from <{element}> to <{target}.{capability}>"),
            Self::UpdateElementProperty {
                element, property, ..
            } => format!("update property <{property}> of element <{element}>"),
            Self::UpdateRelationProperty {
                element,
                relation,
                property,
                ..
            } => format!("update property <{property}> of relation <{element}.{relation}>"),
            Self::SetSubstitution { type_id } => format!("set substitution type <{type_id}>"),
            Self::RemoveSubstitution => "remove substitution type".to_string(),
            Self::UpdateFile { path, .. } => format!("update file <{path}>"),
            Self::UpdateCanonicalDocument { .. } => "update canonical document".to_string(),
        }
    }

    fn upload(&self) -> Option<&FileUpload> {
        match self {
            Self::UpdateFile { upload, .. } | Self::UpdateCanonicalDocument { upload } => {
                Some(upload)
            }
            _ => None,
        }
    }
}

/// One atomic edit on a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Assigned on acceptance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<OperationId>,
    /// Assigned on acceptance from the calling principal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Id of the operation the caller believes is the current tip
    #[serde(default)]
    pub previous_operation_id: Option<OperationId>,
    pub payload: OperationPayload,
}

impl Operation {
    /// New unaccepted operation applying on top of an empty log
    #[must_use]
    pub fn new(payload: OperationPayload) -> Self {
        Self {
            id: None,
            author: None,
            previous_operation_id: None,
            payload,
        }
    }

    /// With the caller's view of the current tip
    #[must_use]
    pub fn after(mut self, previous: Option<OperationId>) -> Self {
        self.previous_operation_id = previous;
        self
    }

    /// Kind used for dispatch
    #[inline]
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.payload.kind()
    }

    /// Staged artifact owned by this operation, if any
    #[must_use]
    pub fn staged_artifact(&self) -> Option<&ArtifactId> {
        self.payload.upload().and_then(FileUpload::staged)
    }

    /// Commit message line: `<author>: <description>`
    #[must_use]
    pub fn commit_line(&self) -> String {
        format!(
            "{}: {}",
            self.author.as_deref().unwrap_or("unknown"),
            self.payload.commit_message()
        )
    }
}
