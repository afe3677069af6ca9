//! In-memory type catalog
//!
//! Keeps the known type descriptors plus, for every saved document, the
//! archives it depends on and the documents it composes through substitution
//! types. Saving a document with a substitution descriptor publishes an
//! element type standing for that document.

use crate::error::EditorResult;
use crate::services::TypeCatalog;
use dashmap::DashMap;
use std::collections::{BTreeSet, HashSet};
use topo_model::{Dependency, Document, DocumentId, TypeDescriptor, TypeId};

#[derive(Debug, Clone, Default)]
struct PublishedDocument {
    dependencies: BTreeSet<Dependency>,
    composes: BTreeSet<DocumentId>,
}

/// Concurrent in-memory [`TypeCatalog`]
#[derive(Debug, Default)]
pub struct InMemoryTypeCatalog {
    types: DashMap<TypeId, TypeDescriptor>,
    documents: DashMap<DocumentId, PublishedDocument>,
}

impl InMemoryTypeCatalog {
    /// Empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-filled with `types`
    #[must_use]
    pub fn with_types(types: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        let catalog = Self::new();
        for ty in types {
            catalog.register(ty);
        }
        catalog
    }

    /// Add or replace a type descriptor
    pub fn register(&self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.id.clone(), descriptor);
    }

    /// Type id under which a document's substitution type is published
    #[must_use]
    pub fn substitution_type_id(document: &Document) -> TypeId {
        TypeId::new(format!("{}:{}", document.archive_name, document.archive_version))
    }

    /// Documents `document` composes, as of its last publication
    #[must_use]
    pub fn composed_documents(&self, document: &DocumentId) -> BTreeSet<DocumentId> {
        self.documents
            .get(document)
            .map(|d| d.composes.clone())
            .unwrap_or_default()
    }

    fn composes(&self, document: &Document) -> BTreeSet<DocumentId> {
        document
            .elements
            .values()
            .filter_map(|e| self.types.get(&e.type_id))
            .filter_map(|ty| ty.substitution_document.clone())
            .collect()
    }
}

impl TypeCatalog for InMemoryTypeCatalog {
    fn resolve(&self, id: &TypeId) -> Option<TypeDescriptor> {
        self.types.get(id).map(|t| t.value().clone())
    }

    fn detect_cyclic_composition(&self, document: &DocumentId, candidate: &TypeDescriptor) -> bool {
        let Some(start) = &candidate.substitution_document else {
            return false;
        };
        let mut seen = HashSet::new();
        let mut stack = vec![start.clone()];
        while let Some(next) = stack.pop() {
            if &next == document {
                return true;
            }
            if seen.insert(next.clone()) {
                stack.extend(self.composed_documents(&next));
            }
        }
        false
    }

    fn dependents(&self, archive: &Dependency, excluding: &DocumentId) -> Vec<DocumentId> {
        self.documents
            .iter()
            .filter(|entry| entry.key() != excluding && entry.value().dependencies.contains(archive))
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn publish(&self, document: &Document) -> EditorResult<()> {
        let published = PublishedDocument {
            dependencies: document.dependencies.clone(),
            composes: self.composes(document),
        };
        self.documents.insert(document.id.clone(), published);

        let substitution_id = Self::substitution_type_id(document);
        match &document.substitution {
            Some(substitution) => {
                let mut exposed = self
                    .resolve(&substitution.type_id)
                    .map(|base| TypeDescriptor {
                        id: substitution_id.clone(),
                        archive: document.archive(),
                        ..base
                    })
                    .unwrap_or_else(|| TypeDescriptor::element(substitution_id.clone(), document.archive()));
                exposed.substitution_document = Some(document.id.clone());
                self.register(exposed);
                tracing::debug!(document = %document.id, ty = %substitution_id, "substitution type published");
            }
            None => {
                self.types.remove(&substitution_id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topo_model::{Element, SubstitutionDescriptor};

    fn base() -> Dependency {
        Dependency::new("base", "1.0")
    }

    fn composing(id: &str, archive: &str, element_type: &str) -> Document {
        let mut doc = Document::new(id, archive, "1.0-SNAPSHOT");
        doc.elements
            .insert("E".into(), Element::new("E", element_type));
        doc
    }

    #[test]
    fn substitution_publishes_a_type_backed_by_the_document() {
        let catalog = InMemoryTypeCatalog::with_types([TypeDescriptor::element("Compute:1.0", base())
            .with_capability("host")]);
        let mut doc = Document::new("inner", "db", "2.0-SNAPSHOT");
        doc.substitution = Some(SubstitutionDescriptor {
            type_id: "Compute:1.0".into(),
        });
        catalog.publish(&doc).unwrap();

        let ty = catalog.resolve(&TypeId::new("db:2.0-SNAPSHOT")).unwrap();
        assert_eq!(ty.substitution_document, Some(DocumentId::new("inner")));
        assert!(ty.capabilities.contains("host"));

        doc.substitution = None;
        catalog.publish(&doc).unwrap();
        assert!(catalog.resolve(&TypeId::new("db:2.0-SNAPSHOT")).is_none());
    }

    #[test]
    fn direct_and_transitive_cycles_are_detected() {
        let catalog = InMemoryTypeCatalog::new();
        catalog.register(TypeDescriptor::element("A:1", base()).substituting("a"));
        catalog.register(TypeDescriptor::element("B:1", base()).substituting("b"));

        // self substitution
        assert!(catalog.detect_cyclic_composition(
            &DocumentId::new("a"),
            &catalog.resolve(&TypeId::new("A:1")).unwrap()
        ));

        // b composes a; adding B into a closes the loop
        catalog.publish(&composing("b", "b", "A:1")).unwrap();
        assert!(catalog.detect_cyclic_composition(
            &DocumentId::new("a"),
            &catalog.resolve(&TypeId::new("B:1")).unwrap()
        ));
        assert!(!catalog.detect_cyclic_composition(
            &DocumentId::new("c"),
            &catalog.resolve(&TypeId::new("B:1")).unwrap()
        ));
    }

    #[test]
    fn dependents_exclude_the_asking_document() {
        let catalog = InMemoryTypeCatalog::new();
        let mut user = Document::new("user", "app", "1.0-SNAPSHOT");
        user.dependencies.insert(Dependency::new("db", "2.0-SNAPSHOT"));
        catalog.publish(&user).unwrap();

        let archive = Dependency::new("db", "2.0-SNAPSHOT");
        assert_eq!(catalog.dependents(&archive, &DocumentId::new("db-doc")), vec![DocumentId::new("user")]);
        assert!(catalog.dependents(&archive, &DocumentId::new("user")).is_empty());
    }
}
