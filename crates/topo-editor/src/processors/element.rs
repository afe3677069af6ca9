use super::{types, EditScope, OperationProcessor};
use crate::error::{EditorError, EditorResult};
use crate::operation::{Operation, OperationKind, OperationPayload};
use topo_model::{is_valid_name, Element, TypeKind};

/// Adds a named element of a resolved element type
#[derive(Debug, Default, Clone, Copy)]
pub struct AddElementProcessor;

impl OperationProcessor for AddElementProcessor {
    fn kind(&self) -> OperationKind {
        OperationKind::AddElement
    }

    fn process(&self, scope: &mut EditScope<'_>, operation: &mut Operation) -> EditorResult<()> {
        let OperationPayload::AddElement { name, type_id } = &operation.payload else {
            return Err(EditorError::Internal(format!("{} routed to add_element", operation.kind())));
        };
        if !is_valid_name(name) {
            return Err(EditorError::InvalidName(name.clone()));
        }
        let document = &mut scope.workspace.document;
        if document.elements.contains_key(name) {
            return Err(EditorError::DuplicateName(name.clone()));
        }

        let catalog = scope.services.catalog.as_ref();
        let descriptor = types::resolve(catalog, type_id, TypeKind::Element)?;
        if catalog.detect_cyclic_composition(scope.document_id, &descriptor) {
            return Err(EditorError::CyclicReference(format!(
                "element type <{type_id}> composes document <{}>",
                scope.document_id
            )));
        }

        types::load(document, &descriptor);
        let mut element = Element::new(name.clone(), type_id.clone());
        element.properties = descriptor.default_values();
        scope.services.workflow.on_element_added(scope.document_id, &element);
        document.elements.insert(name.clone(), element);
        Ok(())
    }
}

/// Removes an element and every relation targeting it
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoveElementProcessor;

impl OperationProcessor for RemoveElementProcessor {
    fn kind(&self) -> OperationKind {
        OperationKind::RemoveElement
    }

    fn process(&self, scope: &mut EditScope<'_>, operation: &mut Operation) -> EditorResult<()> {
        let OperationPayload::RemoveElement { name } = &operation.payload else {
            return Err(EditorError::Internal(format!("{} routed to remove_element", operation.kind())));
        };
        let document = &mut scope.workspace.document;
        let removed = document
            .elements
            .remove(name)
            .ok_or_else(|| EditorError::NotFound(format!("element <{name}>")))?;
        for element in document.elements.values_mut() {
            element.relations.retain(|_, relation| &relation.target != name);
        }
        types::unload_unused(document, scope.services.catalog.as_ref());
        scope.services.workflow.on_element_removed(scope.document_id, &removed);
        Ok(())
    }
}
