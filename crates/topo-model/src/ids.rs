//! Strongly-typed identifiers
//!
//! Every identifier is a string newtype so that document ids, operation ids,
//! staged artifact ids and type ids can never be mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier
            #[inline]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the raw identifier
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Identifier of a document under edition
    DocumentId
}

string_id! {
    /// Identifier assigned to an operation when it is accepted
    OperationId
}

string_id! {
    /// Identifier of a byte stream held by the temporary artifact store
    ArtifactId
}

string_id! {
    /// Identifier of a type descriptor, conventionally `name:version`
    TypeId
}

impl OperationId {
    /// Generate a fresh random id
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl ArtifactId {
    /// Generate a fresh random id
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(OperationId::generate(), OperationId::generate());
        assert_ne!(ArtifactId::generate(), ArtifactId::generate());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = DocumentId::new("app-topology");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"app-topology\"");
        let back: DocumentId = serde_json::from_str("\"app-topology\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn display_matches_raw_value() {
        let id = TypeId::from("tosca.nodes.Compute:1.0");
        assert_eq!(id.to_string(), "tosca.nodes.Compute:1.0");
        assert_eq!(id.as_str(), "tosca.nodes.Compute:1.0");
    }
}
