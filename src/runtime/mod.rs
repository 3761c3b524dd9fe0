pub mod cadence;
pub mod config;
pub mod metrics;
pub mod source;

pub use cadence::{CadenceConfig, CadenceController, CycleTimer};
pub use config::SourceConfig;
pub use source::{BatchSink, DataSource, SourceDriver, TickOutcome};
