use std::sync::Arc;

use anyhow::{anyhow, Result};
use arrow::array::{
    ArrayRef, BooleanArray, FixedSizeBinaryArray, Float64Array, Int64Array, StringArray,
    TimestampNanosecondArray,
};
use arrow::buffer::Buffer;

use crate::common::schema::{SemanticType, UINT128_BYTE_WIDTH};
use crate::common::value::Value;

/// Growable, homogeneously typed column of one tablet.
///
/// One variant per [`SemanticType`]; every operation dispatches with an exhaustive match so
/// adding a type is a compile error everywhere it is not handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Time64Ns(Vec<u64>),
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    Boolean(Vec<bool>),
    UInt128(Vec<u128>),
    String(Vec<String>),
}

/// Runs `$body` with `$v` bound to the inner vector, whatever the variant.
macro_rules! with_column_vec {
    ($column:expr, $v:ident => $body:expr) => {
        match $column {
            Column::Time64Ns($v) => $body,
            Column::Int64($v) => $body,
            Column::Float64($v) => $body,
            Column::Boolean($v) => $body,
            Column::UInt128($v) => $body,
            Column::String($v) => $body,
        }
    };
}

/// Like [`with_column_vec`], but rewraps the result in the same variant.
macro_rules! map_column_vec {
    ($column:expr, $v:ident => $body:expr) => {
        match $column {
            Column::Time64Ns($v) => Column::Time64Ns($body),
            Column::Int64($v) => Column::Int64($body),
            Column::Float64($v) => Column::Float64($body),
            Column::Boolean($v) => Column::Boolean($body),
            Column::UInt128($v) => Column::UInt128($body),
            Column::String($v) => Column::String($body),
        }
    };
}

fn gather_vec<T: Clone>(values: &[T], indexes: &[usize]) -> Vec<T> {
    indexes.iter().map(|&i| values[i].clone()).collect()
}

impl Column {
    pub fn new(semantic_type: SemanticType) -> Self {
        Self::with_capacity(semantic_type, 0)
    }

    pub fn with_capacity(semantic_type: SemanticType, capacity: usize) -> Self {
        match semantic_type {
            SemanticType::Time64Ns => Column::Time64Ns(Vec::with_capacity(capacity)),
            SemanticType::Int64 => Column::Int64(Vec::with_capacity(capacity)),
            SemanticType::Float64 => Column::Float64(Vec::with_capacity(capacity)),
            SemanticType::Boolean => Column::Boolean(Vec::with_capacity(capacity)),
            SemanticType::UInt128 => Column::UInt128(Vec::with_capacity(capacity)),
            SemanticType::String => Column::String(Vec::with_capacity(capacity)),
        }
    }

    pub fn semantic_type(&self) -> SemanticType {
        match self {
            Column::Time64Ns(_) => SemanticType::Time64Ns,
            Column::Int64(_) => SemanticType::Int64,
            Column::Float64(_) => SemanticType::Float64,
            Column::Boolean(_) => SemanticType::Boolean,
            Column::UInt128(_) => SemanticType::UInt128,
            Column::String(_) => SemanticType::String,
        }
    }

    pub fn len(&self) -> usize {
        with_column_vec!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        with_column_vec!(self, v => v.capacity())
    }

    /// Makes room for at least `additional` more values. Only a hint: columns keep growing past it.
    pub fn reserve(&mut self, additional: usize) {
        with_column_vec!(self, v => v.reserve(additional))
    }

    /// Appends one value.
    ///
    /// The value must match the column type. This is checked in debug builds only; in release
    /// builds a mismatched value is replaced by the type's default so the column stays aligned
    /// with its tablet's timestamps.
    pub fn append(&mut self, value: Value) {
        debug_assert_eq!(
            self.semantic_type(),
            value.semantic_type(),
            "value type does not match column type"
        );
        match (self, value) {
            (Column::Time64Ns(v), Value::Time64Ns(x)) => v.push(x),
            (Column::Int64(v), Value::Int64(x)) => v.push(x),
            (Column::Float64(v), Value::Float64(x)) => v.push(x),
            (Column::Boolean(v), Value::Boolean(x)) => v.push(x),
            (Column::UInt128(v), Value::UInt128(x)) => v.push(x),
            (Column::String(v), Value::String(x)) => v.push(x),
            (column, _) => column.append_default(),
        }
    }

    pub(crate) fn append_default(&mut self) {
        with_column_vec!(self, v => v.push(Default::default()))
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            Column::Time64Ns(v) => v.get(index).map(|x| Value::Time64Ns(*x)),
            Column::Int64(v) => v.get(index).map(|x| Value::Int64(*x)),
            Column::Float64(v) => v.get(index).map(|x| Value::Float64(*x)),
            Column::Boolean(v) => v.get(index).map(|x| Value::Boolean(*x)),
            Column::UInt128(v) => v.get(index).map(|x| Value::UInt128(*x)),
            Column::String(v) => v.get(index).map(|x| Value::String(x.clone())),
        }
    }

    /// Builds a new column holding `self[indexes[0]], self[indexes[1]], ...` in that order.
    /// `self` is left untouched. Panics if an index is out of bounds.
    pub fn gather(&self, indexes: &[usize]) -> Column {
        map_column_vec!(self, v => gather_vec(v, indexes))
    }

    /// Exports the column as an Arrow array.
    pub fn to_array(&self) -> Result<ArrayRef> {
        let array: ArrayRef = match self {
            Column::Time64Ns(v) => {
                let times = v
                    .iter()
                    .map(|&t| {
                        i64::try_from(t).map_err(|_| {
                            anyhow!("Time64Ns value {} does not fit an Arrow nanosecond timestamp", t)
                        })
                    })
                    .collect::<Result<Vec<i64>>>()?;
                Arc::new(TimestampNanosecondArray::from(times))
            }
            Column::Int64(v) => Arc::new(Int64Array::from(v.clone())),
            Column::Float64(v) => Arc::new(Float64Array::from(v.clone())),
            Column::Boolean(v) => Arc::new(BooleanArray::from(v.clone())),
            Column::UInt128(v) => {
                let bytes: Vec<u8> = v.iter().flat_map(|x| x.to_be_bytes()).collect();
                Arc::new(FixedSizeBinaryArray::try_new(
                    UINT128_BYTE_WIDTH,
                    Buffer::from_vec(bytes),
                    None,
                )?)
            }
            Column::String(v) => Arc::new(StringArray::from_iter_values(v.iter())),
        };
        Ok(array)
    }
}
