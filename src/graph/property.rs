//! Typed property values for graph nodes and edges
//!
//! A value carries exactly one of four tags: string, 64-bit integer,
//! 64-bit float or boolean. Numeric comparisons across the integer and
//! float tags widen to `f64`.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;

/// Property value: a tagged union over the supported scalar types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl PropertyValue {
    /// Get string value if this is a string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get integer value if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get float value if this is a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get boolean value if this is a boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view of the value: integers widen to `f64`.
    ///
    /// Integers beyond 2^53 lose precision here.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Integer(i) => Some(*i as f64),
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, PropertyValue::Integer(_) | PropertyValue::Float(_))
    }

    /// Equality that tolerates integer/float cross comparison.
    ///
    /// Strings and booleans only equal values of the same tag.
    pub fn loose_eq(&self, other: &PropertyValue) -> bool {
        match (self, other) {
            (PropertyValue::String(a), PropertyValue::String(b)) => a == b,
            (PropertyValue::Boolean(a), PropertyValue::Boolean(b)) => a == b,
            (PropertyValue::Integer(a), PropertyValue::Integer(b)) => a == b,
            (PropertyValue::Integer(_), PropertyValue::Float(_))
            | (PropertyValue::Float(_), PropertyValue::Integer(_))
            | (PropertyValue::Float(_), PropertyValue::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            _ => false,
        }
    }

    /// Get type name as string
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "String",
            PropertyValue::Integer(_) => "Integer",
            PropertyValue::Float(_) => "Float",
            PropertyValue::Boolean(_) => "Boolean",
        }
    }

    /// Convert a JSON scalar into a value, preserving integer vs float.
    ///
    /// Returns `None` for null, arrays and objects. Unsigned integers that
    /// do not fit in `i64` become floats.
    pub fn from_json(value: &JsonValue) -> Option<PropertyValue> {
        match value {
            JsonValue::String(s) => Some(PropertyValue::String(s.clone())),
            JsonValue::Bool(b) => Some(PropertyValue::Boolean(*b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(PropertyValue::Integer(i))
                } else {
                    n.as_f64().map(PropertyValue::Float)
                }
            }
            JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }

    /// Shape an arbitrary JSON argument into a storable value.
    ///
    /// Whole-number floats are stored as integers; anything that is not a
    /// scalar is stored as its JSON text.
    pub fn from_json_lossy(value: &JsonValue) -> PropertyValue {
        if let JsonValue::Number(n) = value {
            if n.as_i64().is_none() {
                if let Some(f) = n.as_f64() {
                    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                        return PropertyValue::Integer(f as i64);
                    }
                    return PropertyValue::Float(f);
                }
            }
        }
        PropertyValue::from_json(value).unwrap_or_else(|| PropertyValue::String(value.to_string()))
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            PropertyValue::String(s) => JsonValue::String(s.clone()),
            PropertyValue::Integer(i) => JsonValue::from(*i),
            PropertyValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            PropertyValue::Boolean(b) => JsonValue::Bool(*b),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "\"{}\"", s),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

// Convenience conversions
impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

/// Property bag for nodes and edges; keys are unique, order is irrelevant
pub type PropertyMap = HashMap<String, PropertyValue>;

/// Convert a JSON object into a property bag using lossy shaping rules
pub fn property_map_from_json(object: &serde_json::Map<String, JsonValue>) -> PropertyMap {
    object
        .iter()
        .map(|(key, value)| (key.clone(), PropertyValue::from_json_lossy(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_property_value_types() {
        assert_eq!(PropertyValue::String("test".to_string()).type_name(), "String");
        assert_eq!(PropertyValue::Integer(42).type_name(), "Integer");
        assert_eq!(PropertyValue::Float(3.5).type_name(), "Float");
        assert_eq!(PropertyValue::Boolean(true).type_name(), "Boolean");
    }

    #[test]
    fn test_numeric_widening() {
        assert_eq!(PropertyValue::Integer(10).as_f64(), Some(10.0));
        assert_eq!(PropertyValue::Float(2.5).as_f64(), Some(2.5));
        assert_eq!(PropertyValue::String("10".into()).as_f64(), None);
        assert!(PropertyValue::Integer(1).is_numeric());
        assert!(!PropertyValue::Boolean(true).is_numeric());
    }

    #[test]
    fn test_loose_eq_crosses_int_and_float() {
        assert!(PropertyValue::Integer(30).loose_eq(&PropertyValue::Float(30.0)));
        assert!(PropertyValue::Float(30.0).loose_eq(&PropertyValue::Integer(30)));
        assert!(!PropertyValue::Integer(30).loose_eq(&PropertyValue::Float(30.5)));
        assert!(!PropertyValue::Integer(1).loose_eq(&PropertyValue::Boolean(true)));
        assert!(!PropertyValue::String("1".into()).loose_eq(&PropertyValue::Integer(1)));
    }

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(PropertyValue::from_json(&json!(5)), Some(PropertyValue::Integer(5)));
        assert_eq!(PropertyValue::from_json(&json!(5.5)), Some(PropertyValue::Float(5.5)));
        assert_eq!(PropertyValue::from_json(&json!("a")), Some("a".into()));
        assert_eq!(PropertyValue::from_json(&json!(true)), Some(true.into()));
        assert_eq!(PropertyValue::from_json(&json!(null)), None);
        assert_eq!(PropertyValue::from_json(&json!([1])), None);
        assert_eq!(
            PropertyValue::from_json(&json!(u64::MAX)),
            Some(PropertyValue::Float(u64::MAX as f64))
        );
    }

    #[test]
    fn test_from_json_lossy_shapes_mutation_arguments() {
        assert_eq!(PropertyValue::from_json_lossy(&json!(30.0)), PropertyValue::Integer(30));
        assert_eq!(PropertyValue::from_json_lossy(&json!(0.25)), PropertyValue::Float(0.25));
        assert_eq!(
            PropertyValue::from_json_lossy(&json!({"a": 1})),
            PropertyValue::String("{\"a\":1}".to_string())
        );
        assert_eq!(
            PropertyValue::from_json_lossy(&json!(null)),
            PropertyValue::String("null".to_string())
        );
    }

    #[test]
    fn test_property_map_from_json() {
        let object = json!({"name": "Alice", "age": 30, "score": 9.5});
        let props = property_map_from_json(object.as_object().unwrap());
        assert_eq!(props.get("name").unwrap().as_string(), Some("Alice"));
        assert_eq!(props.get("age").unwrap().as_integer(), Some(30));
        assert_eq!(props.get("score").unwrap().as_float(), Some(9.5));
    }

    #[test]
    fn test_untagged_serialization() {
        let props: Vec<PropertyValue> = vec![1i64.into(), 1.5.into(), "x".into(), false.into()];
        let text = serde_json::to_string(&props).unwrap();
        assert_eq!(text, "[1,1.5,\"x\",false]");
        let back: Vec<PropertyValue> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, props);
    }
}
