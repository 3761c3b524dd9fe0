use serde::{Deserialize, Serialize};

use super::schema::SemanticType;

/// A single typed cell, as produced by a probe for one schema field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Time64Ns(u64),
    Int64(i64),
    Float64(f64),
    Boolean(bool),
    UInt128(u128),
    String(String),
}

impl Value {
    pub fn semantic_type(&self) -> SemanticType {
        match self {
            Value::Time64Ns(_) => SemanticType::Time64Ns,
            Value::Int64(_) => SemanticType::Int64,
            Value::Float64(_) => SemanticType::Float64,
            Value::Boolean(_) => SemanticType::Boolean,
            Value::UInt128(_) => SemanticType::UInt128,
            Value::String(_) => SemanticType::String,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<u128> for Value {
    fn from(v: u128) -> Self {
        Value::UInt128(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
