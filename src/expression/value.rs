use std::{cmp::Ordering, fmt::{self, Display}};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::expression::DataType;

/// A runtime value produced by literals and interpreted evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Double(OrderedFloat<f64>),
    String(String),
    /// Field values in declaration order
    Struct(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(i64::from(*i)),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(f64::from(*i)),
            Value::Long(l) => Some(*l as f64),
            Value::Double(d) => Some(d.into_inner()),
            _ => None,
        }
    }

    /// Widen a numeric value to `data_type`. Anything else comes back unchanged.
    pub fn cast_to(self, data_type: &DataType) -> Value {
        match (self, data_type) {
            (Value::Int(i), DataType::Long) => Value::Long(i64::from(i)),
            (Value::Int(i), DataType::Double) => Value::from(f64::from(i)),
            (Value::Long(l), DataType::Double) => Value::from(l as f64),
            (v, _) => v,
        }
    }

    /// SQL comparison: numerics compare across widths, NULL and mismatched kinds are incomparable.
    pub fn sql_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Double(_), _) | (_, Value::Double(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            _ => Some(self.as_i64()?.cmp(&other.as_i64()?)),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Long(l) => write!(f, "{l}L"),
            Value::Double(d) => write!(f, "{}", d.into_inner()),
            Value::String(s) => write!(f, "{s}"),
            Value::Struct(vals) => {
                let inner: Vec<String> = vals.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", inner.join(","))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Boolean(b) }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self { Value::Int(i) }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self { Value::Long(l) }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self { Value::Double(OrderedFloat(d)) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::String(s.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numerics_compare_across_widths() {
        assert_eq!(Value::Int(3).sql_cmp(&Value::Long(3)), Some(Ordering::Equal));
        assert_eq!(Value::Int(2).sql_cmp(&Value::from(2.5)), Some(Ordering::Less));
        assert_eq!(Value::from("b").sql_cmp(&Value::from("a")), Some(Ordering::Greater));
    }

    #[test]
    fn cast_only_widens_numerics() {
        assert_eq!(Value::Int(i32::MAX).cast_to(&DataType::Long), Value::Long(i64::from(i32::MAX)));
        assert_eq!(Value::Long(3).cast_to(&DataType::Double), Value::from(3.0));
        assert_eq!(Value::Long(3).cast_to(&DataType::Int), Value::Long(3));
        assert_eq!(Value::Null.cast_to(&DataType::Long), Value::Null);
        assert_eq!(Value::from("x").cast_to(&DataType::Double), Value::from("x"));
    }

    #[test]
    fn null_and_mismatched_kinds_are_incomparable() {
        assert_eq!(Value::Null.sql_cmp(&Value::Int(1)), None);
        assert_eq!(Value::from("1").sql_cmp(&Value::Int(1)), None);
    }
}
