use super::{types, EditScope, OperationProcessor};
use crate::error::{EditorError, EditorResult};
use crate::operation::{Operation, OperationKind, OperationPayload};
use crate::services::EditorServices;
use std::collections::BTreeMap;
use topo_model::{PropertyValue, TypeId, TypeKind};

/// Checked assignment of `property` on an object of type `type_id`
fn assign(
    services: &EditorServices,
    owner: String,
    type_id: &TypeId,
    kind: TypeKind,
    properties: &mut BTreeMap<String, PropertyValue>,
    property: &str,
    value: &PropertyValue,
) -> EditorResult<()> {
    let descriptor = types::resolve(services.catalog.as_ref(), type_id, kind)?;
    let definition = descriptor
        .properties
        .get(property)
        .ok_or_else(|| EditorError::NotFound(format!("property <{property}> on type <{type_id}>")))?;
    services
        .values
        .set_property_value(properties, property, definition, value.clone())
        .map_err(|source| EditorError::PropertyValue {
            owner,
            property: property.to_string(),
            value: value.to_string(),
            source,
        })
}

/// Sets a property of an element
#[derive(Debug, Default, Clone, Copy)]
pub struct UpdateElementPropertyProcessor;

impl OperationProcessor for UpdateElementPropertyProcessor {
    fn kind(&self) -> OperationKind {
        OperationKind::UpdateElementProperty
    }

    fn process(&self, scope: &mut EditScope<'_>, operation: &mut Operation) -> EditorResult<()> {
        let OperationPayload::UpdateElementProperty {
            element,
            property,
            value,
        } = &operation.payload
        else {
            return Err(EditorError::Internal(format!(
                "{} routed to update_element_property",
                operation.kind()
            )));
        };
        let target = scope
            .workspace
            .document
            .element_mut(element)
            .ok_or_else(|| EditorError::NotFound(format!("element <{element}>")))?;
        let type_id = target.type_id.clone();
        assign(
            scope.services,
            format!("element <{element}>"),
            &type_id,
            TypeKind::Element,
            &mut target.properties,
            property,
            value,
        )
    }
}

/// Sets a property of a relation
#[derive(Debug, Default, Clone, Copy)]
pub struct UpdateRelationPropertyProcessor;

impl OperationProcessor for UpdateRelationPropertyProcessor {
    fn kind(&self) -> OperationKind {
        OperationKind::UpdateRelationProperty
    }

    fn process(&self, scope: &mut EditScope<'_>, operation: &mut Operation) -> EditorResult<()> {
        let OperationPayload::UpdateRelationProperty {
            element,
            relation,
            property,
            value,
        } = &operation.payload
        else {
            return Err(EditorError::Internal(format!(
                "{} routed to update_relation_property",
                operation.kind()
            )));
        };
        let target = scope
            .workspace
            .document
            .element_mut(element)
            .ok_or_else(|| EditorError::NotFound(format!("element <{element}>")))?
            .relations
            .get_mut(relation)
            .ok_or_else(|| EditorError::NotFound(format!("relation <{relation}> on element <{element}>")))?;
        let type_id = target.type_id.clone();
        assign(
            scope.services,
            format!("relation <{element}.{relation}>"),
            &type_id,
            TypeKind::Relation,
            &mut target.properties,
            property,
            value,
        )
    }
}
