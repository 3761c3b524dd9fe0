use metrics::{counter, gauge};

use crate::storage::stats::DrainReport;

// Data table metrics
pub const METRIC_DATA_TABLE_DRAINS: &str = "probe_table_drains";
pub const METRIC_DATA_TABLE_ROWS_PUSHED: &str = "probe_table_rows_pushed";
pub const METRIC_DATA_TABLE_ROWS_CARRIED: &str = "probe_table_rows_carried";
pub const METRIC_DATA_TABLE_ROWS_DROPPED: &str = "probe_table_rows_dropped";
pub const METRIC_DATA_TABLE_WATERMARK: &str = "probe_table_watermark";
pub const METRIC_DATA_TABLE_OCCUPANCY: &str = "probe_table_occupancy";

// Source metrics
pub const METRIC_SOURCE_SAMPLES: &str = "probe_source_samples";
pub const METRIC_SOURCE_PUSHES: &str = "probe_source_pushes";

// Label constants
pub const LABEL_TABLE: &str = "table";
pub const LABEL_SOURCE: &str = "source";

/// Publishes one drain's counts. A no-op until the host installs a `metrics` recorder.
pub fn record_drain(table: &str, report: &DrainReport) {
    counter!(METRIC_DATA_TABLE_DRAINS, LABEL_TABLE => table.to_string()).increment(1);
    counter!(METRIC_DATA_TABLE_ROWS_PUSHED, LABEL_TABLE => table.to_string())
        .increment(report.total_pushed() as u64);
    counter!(METRIC_DATA_TABLE_ROWS_CARRIED, LABEL_TABLE => table.to_string())
        .increment(report.total_carried() as u64);
    counter!(METRIC_DATA_TABLE_ROWS_DROPPED, LABEL_TABLE => table.to_string())
        .increment(report.total_expired() as u64);
    gauge!(METRIC_DATA_TABLE_WATERMARK, LABEL_TABLE => table.to_string())
        .set(report.start_time_after as f64);
}

pub fn record_occupancy(table: &str, occupancy: usize) {
    gauge!(METRIC_DATA_TABLE_OCCUPANCY, LABEL_TABLE => table.to_string()).set(occupancy as f64);
}

pub fn record_sample(source: &str) {
    counter!(METRIC_SOURCE_SAMPLES, LABEL_SOURCE => source.to_string()).increment(1);
}

pub fn record_push(source: &str) {
    counter!(METRIC_SOURCE_PUSHES, LABEL_SOURCE => source.to_string()).increment(1);
}
