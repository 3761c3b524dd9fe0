use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::ops::Range;

use anyhow::Result;
use tracing::{debug, warn};

use crate::common::data_batch::TaggedRecordBatch;
use crate::common::key::TabletId;
use crate::common::schema::TableSchema;
use crate::common::value::Value;
use crate::runtime::metrics;
use crate::storage::config::DataTableConfig;
use crate::storage::stats::{DataTableStats, DrainReport, TabletDrainCounts};
use crate::storage::tablet::Tablet;

/// Per-source buffer of probe rows, partitioned into tablets and drained by time window.
///
/// `start_time` is the watermark: the smallest timestamp still eligible for output. It only
/// ever moves forward, to the newest timestamp a drain actually emitted.
///
/// Not synchronized. Appends and drains on the same table must be serialized by the caller.
#[derive(Debug)]
pub struct DataTable {
    schema: TableSchema,
    config: DataTableConfig,
    start_time: u64,
    tablets: HashMap<TabletId, Tablet>,
    stats: DataTableStats,
}

/// Positions into a tablet's time-sorted index list.
///
/// Expired rows are `[0, pushable.start)`, carryover rows are `[pushable.end, len)`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SortedSplit {
    pushable: Range<usize>,
    len: usize,
}

impl SortedSplit {
    /// `sorted_times` must be ascending. Rows below `start_time` expire even when they are also
    /// past `end_time`, so nothing is emitted when `end_time < start_time`.
    fn new(sorted_times: &[u64], start_time: u64, end_time: u64) -> Self {
        let expired_end = sorted_times.partition_point(|&t| t < start_time);
        let pushable_end = sorted_times
            .partition_point(|&t| t <= end_time)
            .max(expired_end);
        Self {
            pushable: expired_end..pushable_end,
            len: sorted_times.len(),
        }
    }

    fn num_expired(&self) -> usize {
        self.pushable.start
    }

    fn num_pushable(&self) -> usize {
        self.pushable.len()
    }

    fn carryover(&self) -> Range<usize> {
        self.pushable.end..self.len
    }
}

impl DataTable {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            config: DataTableConfig::default(),
            start_time: 0,
            tablets: HashMap::new(),
            stats: DataTableStats::default(),
        }
    }

    pub fn with_config(schema: TableSchema, config: DataTableConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(schema)
        })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn config(&self) -> &DataTableConfig {
        &self.config
    }

    /// Current watermark.
    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    pub fn stats(&self) -> &DataTableStats {
        &self.stats
    }

    pub fn num_tablets(&self) -> usize {
        self.tablets.len()
    }

    pub fn contains_tablet(&self, tablet_id: &str) -> bool {
        self.tablets.contains_key(tablet_id)
    }

    pub fn tablet(&self, tablet_id: &str) -> Option<&Tablet> {
        self.tablets.get(tablet_id)
    }

    /// Returns the tablet for `tablet_id`, creating it with reserved columns on first use.
    pub fn get_tablet(&mut self, tablet_id: impl Into<TabletId>) -> &mut Tablet {
        match self.tablets.entry(tablet_id.into()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let tablet = Tablet::with_capacity(
                    entry.key().clone(),
                    &self.schema,
                    self.config.target_capacity,
                );
                entry.insert(tablet)
            }
        }
    }

    /// Shorthand for `get_tablet(tablet_id).append_row(time, values)`.
    pub fn append_row<I>(&mut self, tablet_id: impl Into<TabletId>, time: u64, values: I)
    where
        I: IntoIterator<Item = Value>,
    {
        self.get_tablet(tablet_id).append_row(time, values);
    }

    /// Rows buffered across all tablets.
    pub fn occupancy(&self) -> usize {
        self.tablets.values().map(|t| t.num_rows()).sum()
    }

    /// `occupancy()` relative to the configured target capacity; may exceed 1.0.
    pub fn occupancy_pct(&self) -> f64 {
        self.occupancy() as f64 / self.config.target_capacity as f64
    }

    /// Drains every tablet against the window `[start_time, end_time]`.
    ///
    /// Returns one batch per tablet that had rows inside the window, in unspecified order.
    /// Rows newer than `end_time` stay buffered, rows older than the watermark are dropped.
    pub fn consume_records(&mut self, end_time: u64) -> Vec<TaggedRecordBatch> {
        self.consume_records_with_report(end_time).0
    }

    pub fn consume_records_with_report(
        &mut self,
        end_time: u64,
    ) -> (Vec<TaggedRecordBatch>, DrainReport) {
        let start_time = self.start_time;
        let mut next_start_time = start_time;
        let mut tablets_out = Vec::new();
        let mut carryover_tablets = HashMap::new();
        let mut counts = Vec::with_capacity(self.tablets.len());

        for (tablet_id, tablet) in std::mem::take(&mut self.tablets) {
            debug_assert!(
                tablet.is_aligned(),
                "tablet '{}' has columns out of step with its times",
                tablet_id
            );

            // TODO: skip the sort for tablets appended in time order, most sources are.
            let sort_indexes = tablet.sorted_indexes();
            let sorted_times: Vec<u64> = sort_indexes.iter().map(|&i| tablet.times()[i]).collect();
            let split = SortedSplit::new(&sorted_times, start_time, end_time);

            if split.num_expired() > 0 {
                warn!(
                    table = self.schema.name(),
                    tablet = %tablet_id,
                    dropped = split.num_expired(),
                    start_time,
                    "records dropped due to late arrival"
                );
            }

            let push_indexes = &sort_indexes[split.pushable.clone()];
            if let Some(&last) = push_indexes.last() {
                next_start_time = next_start_time.max(tablet.times()[last]);
                tablets_out.push(TaggedRecordBatch::new(
                    tablet_id.clone(),
                    tablet.gather_records(push_indexes),
                ));
            }

            let carryover_indexes = &sort_indexes[split.carryover()];
            if !carryover_indexes.is_empty() {
                carryover_tablets.insert(tablet_id.clone(), tablet.take_indexes(carryover_indexes));
            }

            counts.push(TabletDrainCounts {
                tablet_id,
                expired: split.num_expired(),
                pushed: split.num_pushable(),
                carried: carryover_indexes.len(),
            });
        }

        self.tablets = carryover_tablets;
        self.start_time = next_start_time;

        let report = DrainReport {
            end_time,
            start_time_before: start_time,
            start_time_after: next_start_time,
            tablets: counts,
        };
        debug!(
            table = self.schema.name(),
            end_time,
            start_time = next_start_time,
            pushed = report.total_pushed(),
            carried = report.total_carried(),
            dropped = report.total_expired(),
            batches = tablets_out.len(),
            "consumed records"
        );
        self.stats.on_drain(&report);
        metrics::record_drain(self.schema.name(), &report);

        (tablets_out, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::common::data_batch::sort_by_tablet_id;
    use crate::common::schema::SemanticType;
    use crate::storage::column::Column;

    fn value_schema() -> TableSchema {
        TableSchema::from_pairs(
            "test_table",
            vec![("time_", SemanticType::Time64Ns), ("value", SemanticType::Float64)],
        )
        .unwrap()
    }

    fn append(table: &mut DataTable, tablet: &str, time: u64, value: f64) {
        table.append_row(tablet, time, vec![Value::Time64Ns(time), Value::Float64(value)]);
    }

    fn values(batch: &TaggedRecordBatch) -> Vec<f64> {
        match &batch.records()[1] {
            Column::Float64(v) => v.clone(),
            other => panic!("unexpected column {:?}", other),
        }
    }

    #[test]
    fn test_split_boundaries() {
        let times = [1, 2, 2, 5, 6, 9];
        assert_eq!(SortedSplit::new(&times, 2, 6).pushable, 1..5);
        assert_eq!(SortedSplit::new(&times, 0, 100).pushable, 0..6);
        assert_eq!(SortedSplit::new(&times, 10, 100).pushable, 6..6);
        // end before start: rows below start expire, the rest carry over
        let split = SortedSplit::new(&times, 5, 3);
        assert_eq!(split.num_expired(), 3);
        assert_eq!(split.num_pushable(), 0);
        assert_eq!(split.carryover(), 3..6);
        assert_eq!(SortedSplit::new(&[], 5, 3).carryover(), 0..0);
    }

    #[test]
    fn test_consume_sorts_and_carries_over() {
        let mut table = DataTable::new(value_schema());
        append(&mut table, "A", 5, 5.0);
        append(&mut table, "A", 3, 31.0);
        append(&mut table, "A", 3, 32.0);
        append(&mut table, "A", 10, 10.0);

        let out = table.consume_records(6);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tablet_id().as_str(), "A");
        assert_eq!(values(&out[0]), vec![31.0, 32.0, 5.0]);
        assert_eq!(out[0].records()[0], Column::Time64Ns(vec![3, 3, 5]));
        assert_eq!(table.start_time(), 5);

        let carried = table.tablet("A").unwrap();
        assert_eq!(carried.times(), &[10]);
        assert_eq!(carried.records()[1], Column::Float64(vec![10.0]));

        // late row is dropped, carried row is emitted
        append(&mut table, "A", 2, 2.0);
        let (out, report) = table.consume_records_with_report(12);
        assert_eq!(out.len(), 1);
        assert_eq!(values(&out[0]), vec![10.0]);
        let counts = report.tablet("A").unwrap();
        assert_eq!((counts.expired, counts.pushed, counts.carried), (1, 1, 0));
        assert_eq!(table.start_time(), 10);
        assert!(!table.contains_tablet("A"));
    }

    #[test]
    fn test_untouched_tablet_is_absent() {
        let mut table = DataTable::new(value_schema());
        append(&mut table, "A", 1, 1.0);
        let out = table.consume_records(100);
        assert_eq!(out.len(), 1);
        assert!(out.iter().all(|b| b.tablet_id().as_str() != "B"));
        assert!(!table.contains_tablet("B"));
        assert_eq!(table.num_tablets(), 0);
    }

    #[test]
    fn test_all_carryover_keeps_start_time() {
        let mut table = DataTable::new(value_schema());
        append(&mut table, "C", 50, 50.0);

        let out = table.consume_records(10);
        assert!(out.is_empty());
        assert_eq!(table.start_time(), 0);
        assert_eq!(table.tablet("C").unwrap().times(), &[50]);
    }

    #[test]
    fn test_all_expired_prunes_tablet() {
        let mut table = DataTable::new(value_schema());
        append(&mut table, "X", 20, 20.0);
        table.consume_records(20);
        assert_eq!(table.start_time(), 20);

        for t in [1, 2, 3] {
            append(&mut table, "D", t, t as f64);
        }
        let (out, report) = table.consume_records_with_report(1_000);
        assert!(out.is_empty());
        assert_eq!(report.tablet("D").unwrap().expired, 3);
        assert_eq!(report.tablets_pruned(), 1);
        assert!(!table.contains_tablet("D"));
        assert_eq!(table.start_time(), 20);
        assert_eq!(table.stats().snapshot().rows_dropped, 3);
    }

    #[test]
    fn test_end_before_start_emits_nothing() {
        let mut table = DataTable::new(value_schema());
        append(&mut table, "A", 30, 30.0);
        table.consume_records(30);

        append(&mut table, "A", 25, 25.0);
        append(&mut table, "A", 40, 40.0);
        let (out, report) = table.consume_records_with_report(10);
        assert!(out.is_empty());
        assert_eq!(table.start_time(), 30);
        let counts = report.tablet("A").unwrap();
        assert_eq!((counts.expired, counts.pushed, counts.carried), (1, 0, 1));
    }

    #[test]
    fn test_start_time_does_not_jump_to_end_time() {
        let mut table = DataTable::new(value_schema());
        append(&mut table, "A", 4, 4.0);
        table.consume_records(100);
        assert_eq!(table.start_time(), 4);

        // a row between the last emitted time and the previous window end is still accepted
        append(&mut table, "B", 50, 50.0);
        let out = table.consume_records(100);
        assert_eq!(out.len(), 1);
        assert_eq!(table.start_time(), 50);
    }

    #[test]
    fn test_empty_tablet_is_pruned() {
        let mut table = DataTable::new(value_schema());
        table.get_tablet("E");
        assert!(table.contains_tablet("E"));
        assert!(table.tablet("E").unwrap().records()[1].capacity() >= 1024);

        let (out, report) = table.consume_records_with_report(10);
        assert!(out.is_empty());
        assert!(!table.contains_tablet("E"));
        // removed, but it never held rows so it does not count as pruned
        assert_eq!(report.tablets_pruned(), 0);
        assert_eq!(table.stats().snapshot().tablets_pruned, 0);

        append(&mut table, "F", 3, 3.0);
        table.get_tablet("G");
        let (_, report) = table.consume_records_with_report(10);
        assert_eq!(report.tablets_pruned(), 1);
        assert_eq!(table.stats().snapshot().tablets_pruned, 1);
    }

    #[test]
    fn test_occupancy() {
        let mut table =
            DataTable::with_config(value_schema(), DataTableConfig { target_capacity: 4 }).unwrap();
        append(&mut table, "A", 1, 1.0);
        append(&mut table, "B", 2, 2.0);
        append(&mut table, "B", 3, 3.0);
        assert_eq!(table.occupancy(), 3);
        assert_eq!(table.occupancy_pct(), 0.75);

        table.consume_records(2);
        assert_eq!(table.occupancy(), 1);
        assert!(DataTable::with_config(value_schema(), DataTableConfig { target_capacity: 0 }).is_err());
    }

    #[test]
    fn test_multiple_tablets_sorted_output() {
        let mut table = DataTable::new(value_schema());
        for (tablet, t) in [("b", 3), ("a", 1), ("c", 9), ("a", 2)] {
            append(&mut table, tablet, t, t as f64);
        }
        let mut out = table.consume_records(5);
        sort_by_tablet_id(&mut out);
        let ids: Vec<&str> = out.iter().map(|b| b.tablet_id().as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(values(&out[0]), vec![1.0, 2.0]);
        assert_eq!(table.start_time(), 3);
        assert!(table.contains_tablet("c"));
    }

    /// Random out-of-order appends interleaved with drains; checks the drain invariants.
    #[test]
    fn test_randomized_drain_invariants() {
        let schema = TableSchema::from_pairs(
            "random",
            vec![("time_", SemanticType::Time64Ns), ("id", SemanticType::Int64)],
        )
        .unwrap();
        let mut table = DataTable::new(schema);
        let mut rng = StdRng::seed_from_u64(7);

        let mut next_id = 0i64;
        let mut emitted = HashSet::new();
        let mut dropped = 0usize;
        let mut clock = 0u64;

        for _round in 0..200 {
            let before: HashMap<TabletId, usize> = {
                for _ in 0..rng.gen_range(0..20) {
                    let tablet = format!("t{}", rng.gen_range(0..4));
                    // mostly recent, sometimes late or far ahead
                    let time = (clock + rng.gen_range(0..50)).saturating_sub(25);
                    table.append_row(tablet.as_str(), time, vec![Value::Time64Ns(time), Value::Int64(next_id)]);
                    next_id += 1;
                }
                table
                    .tablets
                    .iter()
                    .map(|(k, t)| (k.clone(), t.num_rows()))
                    .collect()
            };

            clock += rng.gen_range(0..15);
            let end_time = if rng.gen_bool(0.1) { clock / 2 } else { clock };
            let start_before = table.start_time();
            let (out, report) = table.consume_records_with_report(end_time);

            assert!(table.start_time() >= start_before);
            for counts in &report.tablets {
                assert_eq!(counts.total(), before[&counts.tablet_id]);
            }
            assert_eq!(report.tablets.len(), before.len());

            for batch in &out {
                let (Column::Time64Ns(times), Column::Int64(ids)) = (&batch.records()[0], &batch.records()[1]) else {
                    panic!("unexpected columns");
                };
                assert!(times.windows(2).all(|w| w[0] <= w[1]));
                for (&t, &id) in times.iter().zip(ids) {
                    assert!(start_before <= t && t <= end_time);
                    assert!(emitted.insert(id), "row {} emitted twice", id);
                }
            }
            for tablet in table.tablets.values() {
                assert!(!tablet.is_empty());
                assert!(tablet.times().iter().all(|&t| t > end_time));
            }
            dropped += report.total_expired();
        }

        let remaining = table.occupancy();
        assert_eq!(emitted.len() + dropped + remaining, next_id as usize);
    }
}
