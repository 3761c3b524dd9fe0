pub mod data_batch;
pub mod key;
pub mod schema;
pub mod value;

pub use data_batch::{sort_by_tablet_id, TaggedRecordBatch};
pub use key::TabletId;
pub use schema::{SchemaField, SemanticType, TableSchema};
pub use value::Value;
