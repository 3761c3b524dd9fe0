pub mod column;
pub mod config;
pub mod data_table;
pub mod stats;
pub mod tablet;

pub use column::Column;
pub use config::{DataTableConfig, DEFAULT_TARGET_CAPACITY};
pub use data_table::DataTable;
pub use stats::{DataTableStats, DataTableStatsSnapshot, DrainReport, TabletDrainCounts};
pub use tablet::Tablet;
