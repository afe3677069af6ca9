//! Type descriptors and property values
//!
//! A [`TypeDescriptor`] describes what an element or relation may carry: its
//! property definitions, the capabilities it exposes and, for element types
//! backed by another document, the substituted document.

use crate::ids::{DocumentId, TypeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};

/// An archive (name + version) that types are published from
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// Archive name
    pub name: String,
    /// Archive version
    pub version: String,
}

impl Dependency {
    /// Create a dependency
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl Display for Dependency {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// A concrete property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// `true` / `false`
    Boolean(bool),
    /// Signed integer
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Free text
    Text(String),
}

impl PropertyValue {
    /// Numeric view of the value, if it has one
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Boolean(_) | Self::Text(_) => None,
        }
    }

    /// Value type this value naturally belongs to
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Boolean(_) => ValueType::Boolean,
            Self::Integer(_) => ValueType::Integer,
            Self::Float(_) => ValueType::Float,
            Self::Text(_) => ValueType::String,
        }
    }
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Declared type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// Constraint attached to a property definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Equal(PropertyValue),
    GreaterThan(f64),
    GreaterOrEqual(f64),
    LessThan(f64),
    LessOrEqual(f64),
    InRange(f64, f64),
    ValidValues(Vec<PropertyValue>),
    Length(usize),
    MinLength(usize),
    MaxLength(usize),
    Pattern(String),
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal(v) => write!(f, "equal {v}"),
            Self::GreaterThan(v) => write!(f, "greater_than {v}"),
            Self::GreaterOrEqual(v) => write!(f, "greater_or_equal {v}"),
            Self::LessThan(v) => write!(f, "less_than {v}"),
            Self::LessOrEqual(v) => write!(f, "less_or_equal {v}"),
            Self::InRange(lo, hi) => write!(f, "in_range [{lo}, {hi}]"),
            Self::ValidValues(values) => {
                let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "valid_values [{}]", rendered.join(", "))
            }
            Self::Length(n) => write!(f, "length {n}"),
            Self::MinLength(n) => write!(f, "min_length {n}"),
            Self::MaxLength(n) => write!(f, "max_length {n}"),
            Self::Pattern(p) => write!(f, "pattern {p}"),
        }
    }
}

/// Definition of a property on a type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    /// Declared value type
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Whether a value must be present
    #[serde(default)]
    pub required: bool,
    /// Initial value for new elements / relations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<PropertyValue>,
    /// Constraints every assigned value must satisfy
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
}

impl PropertyDefinition {
    /// Definition with no default and no constraints
    #[inline]
    #[must_use]
    pub fn new(value_type: ValueType) -> Self {
        Self {
            value_type,
            required: false,
            default: None,
            constraints: Vec::new(),
        }
    }

    /// With default value
    #[inline]
    #[must_use]
    pub fn with_default(mut self, value: impl Into<PropertyValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// With an additional constraint
    #[inline]
    #[must_use]
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// What a type describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Element,
    Relation,
}

/// A resolved type description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub id: TypeId,
    pub kind: TypeKind,
    /// Archive the type is published from
    pub archive: Dependency,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDefinition>,
    /// Capabilities relations may target (element types only)
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub capabilities: BTreeSet<String>,
    /// Document this element type stands for, when it is a substitution type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitution_document: Option<DocumentId>,
}

impl TypeDescriptor {
    /// New element type
    #[must_use]
    pub fn element(id: impl Into<TypeId>, archive: Dependency) -> Self {
        Self {
            id: id.into(),
            kind: TypeKind::Element,
            archive,
            properties: BTreeMap::new(),
            capabilities: BTreeSet::new(),
            substitution_document: None,
        }
    }

    /// New relation type
    #[must_use]
    pub fn relation(id: impl Into<TypeId>, archive: Dependency) -> Self {
        Self {
            kind: TypeKind::Relation,
            ..Self::element(id, archive)
        }
    }

    /// With a property definition
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, definition: PropertyDefinition) -> Self {
        self.properties.insert(name.into(), definition);
        self
    }

    /// With an exposed capability
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    /// Mark this type as standing for another document
    #[must_use]
    pub fn substituting(mut self, document: impl Into<DocumentId>) -> Self {
        self.substitution_document = Some(document.into());
        self
    }

    /// Initial property values built from the definitions' defaults
    #[must_use]
    pub fn default_values(&self) -> BTreeMap<String, PropertyValue> {
        self.properties
            .iter()
            .filter_map(|(name, def)| def.default.clone().map(|v| (name.clone(), v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_values_deserialize_by_shape() {
        let values: Vec<PropertyValue> = serde_json::from_str(r#"[true, 3, 2.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                PropertyValue::Boolean(true),
                PropertyValue::Integer(3),
                PropertyValue::Float(2.5),
                PropertyValue::Text("x".into()),
            ]
        );
    }

    #[test]
    fn constraints_read_from_json() {
        let json = r#"{"type": "integer", "constraints": [{"greater_or_equal": 1}, {"in_range": [1, 10]}]}"#;
        let def: PropertyDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.value_type, ValueType::Integer);
        assert_eq!(
            def.constraints,
            vec![Constraint::GreaterOrEqual(1.0), Constraint::InRange(1.0, 10.0)]
        );
    }

    #[test]
    fn default_values_skip_undefaulted_properties() {
        let ty = TypeDescriptor::element("Compute:1.0", Dependency::new("base", "1.0"))
            .with_property("cpus", PropertyDefinition::new(ValueType::Integer).with_default(1))
            .with_property("label", PropertyDefinition::new(ValueType::String));
        let values = ty.default_values();
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("cpus"), Some(&PropertyValue::Integer(1)));
    }

    #[test]
    fn relation_constructor_sets_kind() {
        let ty = TypeDescriptor::relation("HostedOn:1.0", Dependency::new("base", "1.0"));
        assert_eq!(ty.kind, TypeKind::Relation);
    }
}
