//! Property values held by data entities
//!
//! A value is a scalar, a reference to another entity (by `@id`), or an
//! ordered list of either. References never own the referenced entity; they
//! are resolved against the crate during graph validation.

use serde_json::{Map, Number, Value};

use crate::entity::DataEntity;
use crate::error::CrateError;

/// Reference to another entity, rendered as `{"@id": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub id: String,
    /// `@type` of the referenced entity when known at assignment time
    pub entity_type: Option<String>,
}

impl EntityRef {
    /// A bare reference whose target type is resolved later
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: None,
        }
    }

    pub fn typed(id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: Some(entity_type.into()),
        }
    }
}

/// A single property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Ref(EntityRef),
    List(Vec<PropValue>),
}

impl PropValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_entity_ref(&self) -> Option<&EntityRef> {
        match self {
            PropValue::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PropValue]> {
        match self {
            PropValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the value's shape, used in type-mismatch messages
    pub fn type_name(&self) -> &'static str {
        match self {
            PropValue::Str(_) => "str",
            PropValue::Int(_) => "int",
            PropValue::Float(_) => "float",
            PropValue::Bool(_) => "bool",
            PropValue::Ref(_) => "entity reference",
            PropValue::List(_) => "list",
        }
    }

    /// Every entity reference in this value (the value itself or list items)
    pub fn refs(&self) -> Vec<&EntityRef> {
        match self {
            PropValue::Ref(r) => vec![r],
            PropValue::List(items) => items.iter().flat_map(PropValue::refs).collect(),
            _ => vec![],
        }
    }

    /// Whether this value is, or lists, a reference to `id`
    pub fn references(&self, id: &str) -> bool {
        self.refs().iter().any(|r| r.id == id)
    }

    /// Render in JSON-LD form; references become `{"@id": ...}`
    ///
    /// JSON has no NaN or infinity, so a non-finite float is written as its
    /// string form ("NaN", "inf"). It reads back as a string, and both forms
    /// fail a `float` type check.
    pub fn to_json(&self) -> Value {
        match self {
            PropValue::Str(s) => Value::String(s.clone()),
            PropValue::Int(i) => Value::from(*i),
            PropValue::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
            PropValue::Bool(b) => Value::Bool(*b),
            PropValue::Ref(r) => {
                let mut obj = Map::new();
                obj.insert("@id".to_string(), Value::String(r.id.clone()));
                Value::Object(obj)
            }
            PropValue::List(items) => Value::Array(items.iter().map(PropValue::to_json).collect()),
        }
    }

    /// Read a JSON-LD value back
    ///
    /// Only `{"@id": ...}` objects are accepted; any other nested object is
    /// an [`CrateError::InvalidStructure`] error, as is `null`.
    pub fn from_json(value: &Value) -> Result<Self, CrateError> {
        match value {
            Value::String(s) => Ok(PropValue::Str(s.clone())),
            Value::Bool(b) => Ok(PropValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(PropValue::Int(i)),
                None => n.as_f64().map(PropValue::Float).ok_or_else(|| {
                    CrateError::InvalidStructure(format!("unrepresentable number {}", n))
                }),
            },
            Value::Array(items) => items
                .iter()
                .map(PropValue::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(PropValue::List),
            Value::Object(obj) => match obj.get("@id") {
                Some(Value::String(id)) if obj.len() == 1 => Ok(PropValue::Ref(EntityRef::new(id.clone()))),
                _ => Err(CrateError::InvalidStructure(format!(
                    "nested objects other than {{\"@id\": ...}} references are not supported: {}",
                    value
                ))),
            },
            Value::Null => Err(CrateError::InvalidStructure("null property value".to_string())),
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Str(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::Str(s)
    }
}

impl From<i64> for PropValue {
    fn from(i: i64) -> Self {
        PropValue::Int(i)
    }
}

impl From<i32> for PropValue {
    fn from(i: i32) -> Self {
        PropValue::Int(i64::from(i))
    }
}

impl From<f64> for PropValue {
    fn from(f: f64) -> Self {
        PropValue::Float(f)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Bool(b)
    }
}

impl From<EntityRef> for PropValue {
    fn from(r: EntityRef) -> Self {
        PropValue::Ref(r)
    }
}

impl From<&DataEntity> for PropValue {
    fn from(entity: &DataEntity) -> Self {
        PropValue::Ref(entity.to_ref())
    }
}

impl<T: Into<PropValue>> From<Vec<T>> for PropValue {
    fn from(items: Vec<T>) -> Self {
        PropValue::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_renders_as_id_object() {
        let value = PropValue::from(vec![
            EntityRef::typed("https://orcid.org/0000-0001", "Person"),
            EntityRef::new("#person2"),
        ]);
        assert_eq!(
            value.to_json(),
            json!([{"@id": "https://orcid.org/0000-0001"}, {"@id": "#person2"}])
        );
    }

    #[test]
    fn test_from_json() {
        assert_eq!(PropValue::from_json(&json!(1)).unwrap(), PropValue::Int(1));
        assert_eq!(PropValue::from_json(&json!(1.5)).unwrap(), PropValue::Float(1.5));
        assert_eq!(
            PropValue::from_json(&json!({"@id": "./"})).unwrap(),
            PropValue::Ref(EntityRef::new("./"))
        );
        assert!(PropValue::from_json(&json!({"@id": "./", "name": "x"})).is_err());
        assert!(PropValue::from_json(&json!(null)).is_err());
    }

    #[test]
    fn test_non_finite_float_to_json() {
        assert_eq!(PropValue::Float(f64::NAN).to_json(), json!("NaN"));
        assert_eq!(PropValue::Float(f64::INFINITY).to_json(), json!("inf"));
        let back = PropValue::from_json(&PropValue::Float(f64::NEG_INFINITY).to_json()).unwrap();
        assert_eq!(back, PropValue::from("-inf"));
    }

    #[test]
    fn test_refs_and_references() {
        let value = PropValue::from(vec![EntityRef::new("#a"), EntityRef::new("#b")]);
        assert_eq!(value.refs().len(), 2);
        assert!(value.references("#b"));
        assert!(!value.references("#c"));
        assert!(PropValue::from("#a").refs().is_empty());
    }
}
