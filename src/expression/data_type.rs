use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Scalar and nested types an expression can produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Type of the untyped NULL literal
    Null,
    Boolean,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    Double,
    String,
    /// Named, ordered fields
    Struct(Vec<StructField>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl StructField {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self { name: name.into(), data_type, nullable }
    }
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int | DataType::Long | DataType::Double)
    }

    fn numeric_rank(&self) -> Option<u8> {
        match self {
            DataType::Int => Some(0),
            DataType::Long => Some(1),
            DataType::Double => Some(2),
            _ => None,
        }
    }

    /// Find the narrowest type both sides can be widened to.
    ///
    /// Numeric types widen `Int` -> `Long` -> `Double`; `Null` widens to anything.
    /// Unrelated types have no common type.
    pub fn wider(a: &DataType, b: &DataType) -> Option<DataType> {
        if a == b {
            return Some(a.clone());
        }
        match (a, b) {
            (DataType::Null, other) | (other, DataType::Null) => Some(other.clone()),
            _ => match (a.numeric_rank(), b.numeric_rank()) {
                (Some(x), Some(y)) => Some(if x >= y { a.clone() } else { b.clone() }),
                _ => None,
            },
        }
    }

    /// Widen a whole list of types, failing if any pair has no common type.
    pub fn wider_all<'a>(types: impl IntoIterator<Item = &'a DataType>) -> Option<DataType> {
        types.into_iter().try_fold(DataType::Null, |acc, t| DataType::wider(&acc, t))
    }

    pub fn simple_string(&self) -> String {
        match self {
            DataType::Null => "void".to_string(),
            DataType::Boolean => "boolean".to_string(),
            DataType::Int => "int".to_string(),
            DataType::Long => "bigint".to_string(),
            DataType::Double => "double".to_string(),
            DataType::String => "string".to_string(),
            DataType::Struct(fields) => {
                let inner: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}:{}", f.name, f.data_type.simple_string()))
                    .collect();
                format!("struct<{}>", inner.join(","))
            }
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.simple_string())
    }
}
