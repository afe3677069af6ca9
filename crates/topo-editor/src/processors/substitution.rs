use super::{types, EditScope, OperationProcessor};
use crate::error::{EditorError, EditorResult};
use crate::operation::{Operation, OperationKind, OperationPayload};
use topo_model::{SubstitutionDescriptor, TypeKind};

/// Declares the element type the document exposes when substituted
#[derive(Debug, Default, Clone, Copy)]
pub struct SetSubstitutionProcessor;

impl OperationProcessor for SetSubstitutionProcessor {
    fn kind(&self) -> OperationKind {
        OperationKind::SetSubstitution
    }

    fn process(&self, scope: &mut EditScope<'_>, operation: &mut Operation) -> EditorResult<()> {
        let OperationPayload::SetSubstitution { type_id } = &operation.payload else {
            return Err(EditorError::Internal(format!("{} routed to set_substitution", operation.kind())));
        };
        let catalog = scope.services.catalog.as_ref();
        let descriptor = types::resolve(catalog, type_id, TypeKind::Element)?;
        if descriptor.substitution_document.as_ref() == Some(scope.document_id) {
            return Err(EditorError::CyclicReference(format!(
                "type <{type_id}> is the substitution type of document <{}> itself",
                scope.document_id
            )));
        }
        let document = &mut scope.workspace.document;
        document.substitution = Some(SubstitutionDescriptor {
            type_id: type_id.clone(),
        });
        types::load(document, &descriptor);
        types::unload_unused(document, catalog);
        Ok(())
    }
}

/// Clears the substitution descriptor unless another document relies on it
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoveSubstitutionProcessor;

impl OperationProcessor for RemoveSubstitutionProcessor {
    fn kind(&self) -> OperationKind {
        OperationKind::RemoveSubstitution
    }

    fn process(&self, scope: &mut EditScope<'_>, _operation: &mut Operation) -> EditorResult<()> {
        let catalog = scope.services.catalog.as_ref();
        let document = &mut scope.workspace.document;
        if document.substitution.is_none() {
            return Err(EditorError::NotFound(format!(
                "substitution type of document <{}>",
                scope.document_id
            )));
        }
        let dependents = catalog.dependents(&document.archive(), scope.document_id);
        if !dependents.is_empty() {
            let names: Vec<&str> = dependents.iter().map(|d| d.as_str()).collect();
            return Err(EditorError::ReferencedObjectInUse(format!(
                "substitution type of <{}> is used by {}",
                document.archive(),
                names.join(", ")
            )));
        }
        document.substitution = None;
        types::unload_unused(document, catalog);
        Ok(())
    }
}
