pub mod common;
pub mod runtime;
pub mod storage;

pub use common::{TabletId, TableSchema, TaggedRecordBatch, Value};
pub use runtime::{CadenceConfig, CadenceController, CycleTimer};
pub use storage::{Column, DataTable, DataTableConfig};
