use super::{types, EditScope, OperationProcessor};
use crate::error::{EditorError, EditorResult};
use crate::operation::{Operation, OperationKind, OperationPayload};
use topo_model::{is_valid_name, Relation, TypeKind};

/// Adds a relation from an element to a capability of another element
#[derive(Debug, Default, Clone, Copy)]
pub struct AddRelationProcessor;

impl OperationProcessor for AddRelationProcessor {
    fn kind(&self) -> OperationKind {
        OperationKind::AddRelation
    }

    fn process(&self, scope: &mut EditScope<'_>, operation: &mut Operation) -> EditorResult<()> {
        let OperationPayload::AddRelation {
            element,
            name,
            type_id,
            target,
            capability,
        } = &operation.payload
        else {
            return Err(EditorError::Internal(format!("{} routed to add_relation", operation.kind())));
        };
        if !is_valid_name(name) {
            return Err(EditorError::InvalidName(name.clone()));
        }
        let catalog = scope.services.catalog.as_ref();
        let document = &mut scope.workspace.document;

        let target_type = document
            .element(target)
            .ok_or_else(|| EditorError::NotFound(format!("target element <{target}>")))?
            .type_id
            .clone();
        let target_descriptor = types::resolve(catalog, &target_type, TypeKind::Element)?;
        if !target_descriptor.capabilities.contains(capability) {
            return Err(EditorError::NotFound(format!(
                "capability <{capability}> on element <{target}>"
            )));
        }
        let descriptor = types::resolve(catalog, type_id, TypeKind::Relation)?;

        let source = document
            .element(element)
            .ok_or_else(|| EditorError::NotFound(format!("element <{element}>")))?;
        if source.relations.contains_key(name) {
            return Err(EditorError::DuplicateName(name.clone()));
        }

        types::load(document, &descriptor);
        let relation = Relation {
            name: name.clone(),
            type_id: type_id.clone(),
            target: target.clone(),
            capability: capability.clone(),
            properties: descriptor.default_values(),
        };
        if let Some(source) = document.element_mut(element) {
            source.relations.insert(name.clone(), relation);
        }
        Ok(())
    }
}
