//! The document under edition
//!
//! A [`Document`] is a graph of named [`Element`]s. Each element carries
//! property values and named [`Relation`]s pointing at a capability of another
//! element. The document also records the archives it depends on and,
//! optionally, the type it exposes when substituted into other documents.

use crate::fingerprint::{Fingerprint, FingerprintError};
use crate::ids::{DocumentId, TypeId};
use crate::types::{Dependency, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Version suffix marking a mutable (work in progress) archive version
pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Check an element or relation name
///
/// Names are non-empty and only contain ASCII alphanumerics and underscores.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A named, typed edge from an element to another element's capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    #[serde(rename = "type")]
    pub type_id: TypeId,
    /// Target element name
    pub target: String,
    /// Capability of the target the relation binds to
    pub capability: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
}

/// A named node of the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    #[serde(rename = "type")]
    pub type_id: TypeId,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relations: BTreeMap<String, Relation>,
}

impl Element {
    /// Element with no properties or relations
    #[must_use]
    pub fn new(name: impl Into<String>, type_id: impl Into<TypeId>) -> Self {
        Self {
            name: name.into(),
            type_id: type_id.into(),
            properties: BTreeMap::new(),
            relations: BTreeMap::new(),
        }
    }
}

/// The type a document exposes when used as a building block elsewhere
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionDescriptor {
    /// Element type the substitution is based on
    #[serde(rename = "type")]
    pub type_id: TypeId,
}

/// The structured artifact under edition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub archive_name: String,
    pub archive_version: String,
    /// Path of the canonical serialized file inside the archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_path: Option<String>,
    #[serde(default)]
    pub elements: BTreeMap<String, Element>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub dependencies: BTreeSet<Dependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitution: Option<SubstitutionDescriptor>,
}

impl Document {
    /// Empty document
    #[must_use]
    pub fn new(
        id: impl Into<DocumentId>,
        archive_name: impl Into<String>,
        archive_version: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            archive_name: archive_name.into(),
            archive_version: archive_version.into(),
            canonical_path: None,
            elements: BTreeMap::new(),
            dependencies: BTreeSet::new(),
            substitution: None,
        }
    }

    /// The archive this document is published as
    #[must_use]
    pub fn archive(&self) -> Dependency {
        Dependency::new(&self.archive_name, &self.archive_version)
    }

    /// Released versions are immutable
    #[inline]
    #[must_use]
    pub fn is_released(&self) -> bool {
        !self.archive_version.ends_with(SNAPSHOT_SUFFIX)
    }

    /// Look up an element
    #[inline]
    #[must_use]
    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements.get(name)
    }

    /// Look up an element mutably
    #[inline]
    pub fn element_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements.get_mut(name)
    }

    /// Every type id referenced by elements, relations and the substitution
    #[must_use]
    pub fn referenced_types(&self) -> BTreeSet<&TypeId> {
        let mut types = BTreeSet::new();
        for element in self.elements.values() {
            types.insert(&element.type_id);
            for relation in element.relations.values() {
                types.insert(&relation.type_id);
            }
        }
        if let Some(substitution) = &self.substitution {
            types.insert(&substitution.type_id);
        }
        types
    }

    /// Structural fingerprint of the document
    ///
    /// # Errors
    /// Returns error if the document cannot be encoded
    pub fn fingerprint(&self) -> Result<Fingerprint, FingerprintError> {
        Fingerprint::of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut doc = Document::new("doc-1", "web", "1.0.0-SNAPSHOT");
        let mut server = Element::new("Server", "Compute:1.0");
        server.relations.insert(
            "hostedOn".into(),
            Relation {
                name: "hostedOn".into(),
                type_id: "HostedOn:1.0".into(),
                target: "Host".into(),
                capability: "host".into(),
                properties: BTreeMap::new(),
            },
        );
        doc.elements.insert("Server".into(), server);
        doc.elements.insert("Host".into(), Element::new("Host", "Compute:1.0"));
        doc
    }

    #[test]
    fn names_are_alphanumeric_or_underscore() {
        assert!(is_valid_name("web_server_1"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("web-server"));
        assert!(!is_valid_name("caf\u{e9}"));
    }

    #[test]
    fn snapshot_versions_are_mutable() {
        assert!(!Document::new("a", "n", "1.0.0-SNAPSHOT").is_released());
        assert!(Document::new("a", "n", "1.0.0").is_released());
    }

    #[test]
    fn referenced_types_cover_relations_and_substitution() {
        let mut doc = sample();
        doc.substitution = Some(SubstitutionDescriptor {
            type_id: "Web:1.0".into(),
        });
        let types: Vec<&str> = doc.referenced_types().into_iter().map(TypeId::as_str).collect();
        assert_eq!(types, vec!["Compute:1.0", "HostedOn:1.0", "Web:1.0"]);
    }

    #[test]
    fn fingerprint_tracks_structure() {
        let a = sample();
        let mut b = sample();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        b.elements.remove("Host");
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }
}
