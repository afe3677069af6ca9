//! Type resolution and dependency bookkeeping shared by processors

use crate::error::{EditorError, EditorResult};
use crate::services::TypeCatalog;
use topo_model::{Document, TypeDescriptor, TypeId, TypeKind};

/// Resolve `id` and check it describes `kind`
pub(super) fn resolve(catalog: &dyn TypeCatalog, id: &TypeId, kind: TypeKind) -> EditorResult<TypeDescriptor> {
    let descriptor = catalog
        .resolve(id)
        .ok_or_else(|| EditorError::NotFound(format!("type <{id}>")))?;
    if descriptor.kind != kind {
        return Err(EditorError::Validation(format!(
            "type <{id}> is not a {} type",
            match kind {
                TypeKind::Element => "element",
                TypeKind::Relation => "relation",
            }
        )));
    }
    Ok(descriptor)
}

/// Record the archive of `descriptor` as a dependency of the document
pub(super) fn load(document: &mut Document, descriptor: &TypeDescriptor) {
    if descriptor.archive != document.archive() {
        document.dependencies.insert(descriptor.archive.clone());
    }
}

/// Drop dependencies no referenced type comes from anymore
pub(super) fn unload_unused(document: &mut Document, catalog: &dyn TypeCatalog) {
    let used: Vec<_> = document
        .referenced_types()
        .into_iter()
        .filter_map(|id| catalog.resolve(id))
        .map(|ty| ty.archive)
        .collect();
    document.dependencies.retain(|dep| used.contains(dep));
}
