use anyhow::{ensure, Result};
use arrow::array::ArrayRef;
use arrow::record_batch::RecordBatch;

use super::key::TabletId;
use super::schema::TableSchema;
use crate::storage::column::Column;

/// Rows of one tablet emitted by a drain, schema-aligned and sorted by time.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedRecordBatch {
    pub tablet_id: TabletId,
    pub records: Vec<Column>,
}

impl TaggedRecordBatch {
    pub fn new(tablet_id: TabletId, records: Vec<Column>) -> Self {
        Self { tablet_id, records }
    }

    pub fn tablet_id(&self) -> &TabletId {
        &self.tablet_id
    }

    pub fn records(&self) -> &[Column] {
        &self.records
    }

    pub fn num_rows(&self) -> usize {
        self.records.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn column(&self, schema: &TableSchema, field_name: &str) -> Option<&Column> {
        schema.index_of(field_name).and_then(|i| self.records.get(i))
    }

    /// Converts the batch to an Arrow `RecordBatch` with `schema`'s field names and types.
    pub fn to_record_batch(&self, schema: &TableSchema) -> Result<RecordBatch> {
        ensure!(
            self.records.len() == schema.num_fields(),
            "batch for tablet '{}' has {} columns, schema '{}' has {}",
            self.tablet_id,
            self.records.len(),
            schema.name(),
            schema.num_fields()
        );
        for (column, field) in self.records.iter().zip(schema.fields()) {
            ensure!(
                column.semantic_type() == field.semantic_type,
                "column '{}' holds {} but schema declares {}",
                field.name,
                column.semantic_type(),
                field.semantic_type
            );
        }
        let arrays = self
            .records
            .iter()
            .map(|c| c.to_array())
            .collect::<Result<Vec<ArrayRef>>>()?;
        Ok(RecordBatch::try_new(schema.to_arrow_schema(), arrays)?)
    }
}

/// Orders batches by tablet id, for consumers that need a deterministic drain output.
pub fn sort_by_tablet_id(batches: &mut [TaggedRecordBatch]) {
    batches.sort_by(|a, b| a.tablet_id.cmp(&b.tablet_id));
}
