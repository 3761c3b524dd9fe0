use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Result};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use serde::{Deserialize, Serialize};

/// Width of the fixed-size binary encoding used to export `UInt128` columns to Arrow.
pub const UINT128_BYTE_WIDTH: i32 = 16;

/// Closed set of value types a probe column can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    Time64Ns,
    Int64,
    Float64,
    Boolean,
    UInt128,
    String,
}

impl SemanticType {
    pub fn arrow_data_type(&self) -> DataType {
        match self {
            SemanticType::Time64Ns => DataType::Timestamp(TimeUnit::Nanosecond, None),
            SemanticType::Int64 => DataType::Int64,
            SemanticType::Float64 => DataType::Float64,
            SemanticType::Boolean => DataType::Boolean,
            SemanticType::UInt128 => DataType::FixedSizeBinary(UINT128_BYTE_WIDTH),
            SemanticType::String => DataType::Utf8,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticType::Time64Ns => "TIME64NS",
            SemanticType::Int64 => "INT64",
            SemanticType::Float64 => "FLOAT64",
            SemanticType::Boolean => "BOOLEAN",
            SemanticType::UInt128 => "UINT128",
            SemanticType::String => "STRING",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub semantic_type: SemanticType,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic_type,
        }
    }
}

/// Ordered field list of a data table. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    name: String,
    fields: Vec<SchemaField>,
}

impl TableSchema {
    pub fn try_new(name: impl Into<String>, fields: Vec<SchemaField>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            bail!("table name must not be empty");
        }
        if fields.is_empty() {
            bail!("table '{}' must declare at least one field", name);
        }
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if field.name.is_empty() {
                bail!("table '{}' has a field with an empty name", name);
            }
            if !seen.insert(field.name.as_str()) {
                bail!("table '{}' declares field '{}' more than once", name, field.name);
            }
        }
        Ok(Self { name, fields })
    }

    /// Convenience constructor from `(name, type)` pairs.
    pub fn from_pairs<N: Into<String>>(
        name: impl Into<String>,
        pairs: impl IntoIterator<Item = (N, SemanticType)>,
    ) -> Result<Self> {
        let fields = pairs
            .into_iter()
            .map(|(n, t)| SchemaField::new(n, t))
            .collect();
        Self::try_new(name, fields)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn index_of(&self, field_name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == field_name)
    }

    pub fn semantic_types(&self) -> impl Iterator<Item = SemanticType> + '_ {
        self.fields.iter().map(|f| f.semantic_type)
    }

    pub fn to_arrow_schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .fields
            .iter()
            .map(|f| Field::new(f.name.clone(), f.semantic_type.arrow_data_type(), false))
            .collect();
        Arc::new(Schema::new(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_rejects_duplicates_and_empty() {
        assert!(TableSchema::from_pairs("t", vec![("a", SemanticType::Int64), ("a", SemanticType::Float64)]).is_err());
        assert!(TableSchema::from_pairs("t", vec![("", SemanticType::Int64)]).is_err());
        assert!(TableSchema::from_pairs("", vec![("a", SemanticType::Int64)]).is_err());
        assert!(TableSchema::try_new("t", vec![]).is_err());
    }

    #[test]
    fn test_arrow_schema_follows_field_order() {
        let schema = TableSchema::from_pairs(
            "conn_stats",
            vec![
                ("time_", SemanticType::Time64Ns),
                ("upid", SemanticType::UInt128),
                ("bytes", SemanticType::Int64),
            ],
        )
        .unwrap();

        let arrow_schema = schema.to_arrow_schema();
        assert_eq!(arrow_schema.fields().len(), 3);
        assert_eq!(arrow_schema.field(0).name(), "time_");
        assert_eq!(
            arrow_schema.field(0).data_type(),
            &DataType::Timestamp(TimeUnit::Nanosecond, None)
        );
        assert_eq!(arrow_schema.field(1).data_type(), &DataType::FixedSizeBinary(16));
        assert_eq!(schema.index_of("bytes"), Some(2));
        assert_eq!(schema.index_of("missing"), None);
    }
}
