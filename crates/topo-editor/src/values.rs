//! Property value coercion and constraint checking

use crate::error::ConstraintError;
use crate::services::PropertyValueService;
use std::collections::BTreeMap;
use topo_model::{Constraint, PropertyDefinition, PropertyValue, ValueType};

/// Coerces values to their declared type and checks declared constraints
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstraintValueService;

impl PropertyValueService for ConstraintValueService {
    fn set_property_value(
        &self,
        properties: &mut BTreeMap<String, PropertyValue>,
        name: &str,
        definition: &PropertyDefinition,
        value: PropertyValue,
    ) -> Result<(), ConstraintError> {
        let value = coerce(value, definition.value_type)?;
        for constraint in &definition.constraints {
            check(constraint, &value)?;
        }
        properties.insert(name.to_string(), value);
        Ok(())
    }
}

/// Convert `value` into `target`, parsing text where it makes sense
///
/// # Errors
/// [`ConstraintError::TypeMismatch`] when no lossless conversion exists
pub fn coerce(value: PropertyValue, target: ValueType) -> Result<PropertyValue, ConstraintError> {
    let mismatch = || ConstraintError::TypeMismatch { expected: target };
    match (target, value) {
        (ValueType::String, PropertyValue::Text(s)) => Ok(PropertyValue::Text(s)),
        (ValueType::String, other) => Ok(PropertyValue::Text(other.to_string())),
        (ValueType::Integer, PropertyValue::Integer(i)) => Ok(PropertyValue::Integer(i)),
        (ValueType::Integer, PropertyValue::Text(s)) => {
            s.trim().parse().map(PropertyValue::Integer).map_err(|_| mismatch())
        }
        (ValueType::Float, PropertyValue::Float(f)) => Ok(PropertyValue::Float(f)),
        #[allow(clippy::cast_precision_loss)]
        (ValueType::Float, PropertyValue::Integer(i)) => Ok(PropertyValue::Float(i as f64)),
        (ValueType::Float, PropertyValue::Text(s)) => {
            s.trim().parse().map(PropertyValue::Float).map_err(|_| mismatch())
        }
        (ValueType::Boolean, PropertyValue::Boolean(b)) => Ok(PropertyValue::Boolean(b)),
        (ValueType::Boolean, PropertyValue::Text(s)) => match s.trim() {
            "true" => Ok(PropertyValue::Boolean(true)),
            "false" => Ok(PropertyValue::Boolean(false)),
            _ => Err(mismatch()),
        },
        _ => Err(mismatch()),
    }
}

fn same_value(a: &PropertyValue, b: &PropertyValue) -> bool {
    match (a.as_f64(), b.as_f64()) {
        #[allow(clippy::float_cmp)]
        (Some(x), Some(y)) => x == y,
        _ => a.to_string() == b.to_string(),
    }
}

fn check(constraint: &Constraint, value: &PropertyValue) -> Result<(), ConstraintError> {
    let violation = || ConstraintError::Violation(constraint.clone());
    let number = || value.as_f64().ok_or_else(violation);
    let length = || value.to_string().chars().count();

    let ok = match constraint {
        Constraint::Equal(expected) => same_value(value, expected),
        Constraint::GreaterThan(bound) => number()? > *bound,
        Constraint::GreaterOrEqual(bound) => number()? >= *bound,
        Constraint::LessThan(bound) => number()? < *bound,
        Constraint::LessOrEqual(bound) => number()? <= *bound,
        Constraint::InRange(lo, hi) => {
            let n = number()?;
            *lo <= n && n <= *hi
        }
        Constraint::ValidValues(values) => values.iter().any(|v| same_value(value, v)),
        Constraint::Length(n) => length() == *n,
        Constraint::MinLength(n) => length() >= *n,
        Constraint::MaxLength(n) => length() <= *n,
        Constraint::Pattern(pattern) => {
            let re = regex::Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
                ConstraintError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                }
            })?;
            re.is_match(&value.to_string())
        }
    };
    if ok {
        Ok(())
    } else {
        Err(violation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assign(def: &PropertyDefinition, value: impl Into<PropertyValue>) -> Result<BTreeMap<String, PropertyValue>, ConstraintError> {
        let mut props = BTreeMap::new();
        ConstraintValueService.set_property_value(&mut props, "p", def, value.into())?;
        Ok(props)
    }

    #[test]
    fn text_is_coerced_to_declared_type() {
        let def = PropertyDefinition::new(ValueType::Integer);
        let props = assign(&def, "42").unwrap();
        assert_eq!(props["p"], PropertyValue::Integer(42));

        let def = PropertyDefinition::new(ValueType::Boolean);
        assert_eq!(assign(&def, "true").unwrap()["p"], PropertyValue::Boolean(true));
    }

    #[test]
    fn uncoercible_values_are_type_mismatches() {
        let def = PropertyDefinition::new(ValueType::Integer);
        let err = assign(&def, "forty-two").unwrap_err();
        assert!(matches!(err, ConstraintError::TypeMismatch { expected: ValueType::Integer }));
        assert!(assign(&def, 1.5).is_err());
    }

    #[test]
    fn numeric_bounds_are_enforced() {
        let def = PropertyDefinition::new(ValueType::Integer)
            .with_constraint(Constraint::GreaterOrEqual(1.0))
            .with_constraint(Constraint::LessThan(65536.0));
        assert!(assign(&def, 8080_i64).is_ok());
        assert!(matches!(
            assign(&def, 0_i64).unwrap_err(),
            ConstraintError::Violation(Constraint::GreaterOrEqual(_))
        ));
        assert!(assign(&def, 65536_i64).is_err());
    }

    #[test]
    fn valid_values_and_lengths() {
        let def = PropertyDefinition::new(ValueType::String)
            .with_constraint(Constraint::ValidValues(vec!["small".into(), "large".into()]));
        assert!(assign(&def, "small").is_ok());
        assert!(assign(&def, "medium").is_err());

        let def = PropertyDefinition::new(ValueType::String)
            .with_constraint(Constraint::MinLength(2))
            .with_constraint(Constraint::MaxLength(4));
        assert!(assign(&def, "abc").is_ok());
        assert!(assign(&def, "a").is_err());
        assert!(assign(&def, "abcde").is_err());
    }

    #[test]
    fn patterns_match_the_whole_value() {
        let def = PropertyDefinition::new(ValueType::String)
            .with_constraint(Constraint::Pattern("[a-z]+".into()));
        assert!(assign(&def, "abc").is_ok());
        assert!(assign(&def, "abc1").is_err());

        let def = PropertyDefinition::new(ValueType::String)
            .with_constraint(Constraint::Pattern("(".into()));
        assert!(matches!(
            assign(&def, "x").unwrap_err(),
            ConstraintError::InvalidPattern { .. }
        ));
    }

    #[test]
    fn failed_assignment_leaves_map_untouched() {
        let def = PropertyDefinition::new(ValueType::Integer).with_constraint(Constraint::Equal(PropertyValue::Integer(3)));
        let mut props = BTreeMap::new();
        props.insert("p".to_string(), PropertyValue::Integer(3));
        let result = ConstraintValueService.set_property_value(&mut props, "p", &def, PropertyValue::Integer(4));
        assert!(result.is_err());
        assert_eq!(props["p"], PropertyValue::Integer(3));
    }
}
