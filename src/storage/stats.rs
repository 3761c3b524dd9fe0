use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::common::key::TabletId;

/// Cumulative counters of one data table, for debugging and tuning.
///
/// Atomics only so a snapshot can be taken through `&DataTable`; the table itself is still
/// single-writer.
#[derive(Debug, Default)]
pub struct DataTableStats {
    drains: AtomicU64,
    rows_pushed: AtomicU64,
    rows_carried: AtomicU64,
    rows_dropped: AtomicU64,
    batches_emitted: AtomicU64,
    tablets_pruned: AtomicU64,
}

impl DataTableStats {
    pub fn snapshot(&self) -> DataTableStatsSnapshot {
        DataTableStatsSnapshot {
            drains: self.drains.load(Ordering::Relaxed),
            rows_pushed: self.rows_pushed.load(Ordering::Relaxed),
            rows_carried: self.rows_carried.load(Ordering::Relaxed),
            rows_dropped: self.rows_dropped.load(Ordering::Relaxed),
            batches_emitted: self.batches_emitted.load(Ordering::Relaxed),
            tablets_pruned: self.tablets_pruned.load(Ordering::Relaxed),
        }
    }

    // ----------------- update helpers -----------------

    pub(crate) fn on_drain(&self, report: &DrainReport) {
        self.drains.fetch_add(1, Ordering::Relaxed);
        self.rows_pushed
            .fetch_add(report.total_pushed() as u64, Ordering::Relaxed);
        self.rows_carried
            .fetch_add(report.total_carried() as u64, Ordering::Relaxed);
        self.rows_dropped
            .fetch_add(report.total_expired() as u64, Ordering::Relaxed);
        self.batches_emitted
            .fetch_add(report.batches_emitted() as u64, Ordering::Relaxed);
        self.tablets_pruned
            .fetch_add(report.tablets_pruned() as u64, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTableStatsSnapshot {
    pub drains: u64,
    pub rows_pushed: u64,
    pub rows_carried: u64,
    pub rows_dropped: u64,
    pub batches_emitted: u64,
    pub tablets_pruned: u64,
}

/// How one tablet's rows were split by a drain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabletDrainCounts {
    pub tablet_id: TabletId,
    pub expired: usize,
    pub pushed: usize,
    pub carried: usize,
}

impl TabletDrainCounts {
    pub fn total(&self) -> usize {
        self.expired + self.pushed + self.carried
    }
}

/// Outcome of a single drain call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub end_time: u64,
    pub start_time_before: u64,
    pub start_time_after: u64,
    pub tablets: Vec<TabletDrainCounts>,
}

impl DrainReport {
    pub fn total_expired(&self) -> usize {
        self.tablets.iter().map(|t| t.expired).sum()
    }

    pub fn total_pushed(&self) -> usize {
        self.tablets.iter().map(|t| t.pushed).sum()
    }

    pub fn total_carried(&self) -> usize {
        self.tablets.iter().map(|t| t.carried).sum()
    }

    pub fn batches_emitted(&self) -> usize {
        self.tablets.iter().filter(|t| t.pushed > 0).count()
    }

    /// Tablets that had rows going in and none left afterwards.
    pub fn tablets_pruned(&self) -> usize {
        self.tablets
            .iter()
            .filter(|t| t.total() > 0 && t.carried == 0)
            .count()
    }

    pub fn tablet(&self, tablet_id: &str) -> Option<&TabletDrainCounts> {
        self.tablets.iter().find(|t| t.tablet_id.as_str() == tablet_id)
    }
}
