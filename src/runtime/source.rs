use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::common::data_batch::TaggedRecordBatch;
use crate::common::schema::TableSchema;
use crate::runtime::cadence::{CadenceConfig, CadenceController};
use crate::runtime::config::SourceConfig;
use crate::runtime::metrics;
use crate::storage::config::DataTableConfig;
use crate::storage::data_table::DataTable;

/// A probe's user-space side: periodically moves whatever the probe collected into a table.
pub trait DataSource: Send {
    fn name(&self) -> &str;

    fn schema(&self) -> &TableSchema;

    /// Appends newly collected rows. Called whenever sampling is due.
    fn transfer_data(&mut self, table: &mut DataTable) -> Result<()>;
}

/// Receives drained batches, e.g. the table store.
pub trait BatchSink: Send {
    fn push(&mut self, schema: &TableSchema, batches: Vec<TaggedRecordBatch>) -> Result<()>;
}

impl<F> BatchSink for F
where
    F: FnMut(&TableSchema, Vec<TaggedRecordBatch>) -> Result<()> + Send,
{
    fn push(&mut self, schema: &TableSchema, batches: Vec<TaggedRecordBatch>) -> Result<()> {
        self(schema, batches)
    }
}

/// Shortest wait between two ticks of [`SourceDriver::run_until_cancelled`].
pub const MIN_WAKEUP_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub sampled: bool,
    pub pushed: bool,
    pub batches: usize,
}

/// Drives one source: samples it into its table and drains the table into a sink, on the
/// cadence's schedule.
pub struct SourceDriver<S, K> {
    source: S,
    sink: K,
    table: DataTable,
    cadence: CadenceController,
}

impl<S: DataSource, K: BatchSink> SourceDriver<S, K> {
    pub fn new(
        source: S,
        sink: K,
        table_config: DataTableConfig,
        cadence_config: &CadenceConfig,
    ) -> Result<Self> {
        let table = DataTable::with_config(source.schema().clone(), table_config)
            .with_context(|| format!("invalid table config for source '{}'", source.name()))?;
        let cadence = CadenceController::new(cadence_config)
            .with_context(|| format!("invalid cadence config for source '{}'", source.name()))?;
        Ok(Self {
            source,
            sink,
            table,
            cadence,
        })
    }

    pub fn from_config(source: S, sink: K, config: &SourceConfig) -> Result<Self> {
        Self::new(source, sink, config.table, &config.cadence)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn table(&self) -> &DataTable {
        &self.table
    }

    pub fn cadence(&self) -> &CadenceController {
        &self.cadence
    }

    pub fn cadence_mut(&mut self) -> &mut CadenceController {
        &mut self.cadence
    }

    /// Samples and/or drains if due. `now_ns` is the end of the drain window, in the same time
    /// base as the source's row timestamps.
    pub fn tick(&mut self, now_ns: u64) -> Result<TickOutcome> {
        let mut outcome = TickOutcome::default();

        if self.cadence.sampling_due() {
            self.source
                .transfer_data(&mut self.table)
                .with_context(|| format!("source '{}' failed to transfer data", self.source.name()))?;
            self.cadence.mark_sampled();
            metrics::record_sample(self.source.name());
            metrics::record_occupancy(self.table.schema().name(), self.table.occupancy());
            outcome.sampled = true;
        }

        if self
            .cadence
            .push_due(self.table.occupancy_pct(), self.table.occupancy())
        {
            outcome.batches = self.push(now_ns)?;
            self.cadence.mark_pushed();
            outcome.pushed = true;
        }

        Ok(outcome)
    }

    /// Drains the table up to `now_ns` regardless of the cadence. Returns the batch count.
    ///
    /// Drained rows have left the table before the sink sees them: if the sink fails they are
    /// lost, and the error is returned after logging how many rows went with it.
    pub fn push(&mut self, now_ns: u64) -> Result<usize> {
        let batches = self.table.consume_records(now_ns);
        let num_batches = batches.len();
        metrics::record_push(self.source.name());
        if num_batches > 0 {
            debug!(
                source = self.source.name(),
                batches = num_batches,
                end_time = now_ns,
                "pushing batches"
            );
            let num_rows: usize = batches.iter().map(|b| b.num_rows()).sum();
            if let Err(err) = self.sink.push(self.table.schema(), batches) {
                warn!(
                    source = self.source.name(),
                    batches = num_batches,
                    rows = num_rows,
                    end_time = now_ns,
                    "sink rejected drained batches, rows lost: {:#}",
                    err
                );
                return Err(err.context(format!(
                    "sink failed for source '{}', {} drained rows lost",
                    self.source.name(),
                    num_rows
                )));
            }
        }
        Ok(num_batches)
    }

    /// Ticks whenever the cadence next has work, until `cancel` fires, then drains once more.
    ///
    /// `clock` yields the current time in the row timestamp base. Ticks are at least
    /// [`MIN_WAKEUP_INTERVAL`] apart, even with zero periods.
    pub async fn run_until_cancelled<C>(&mut self, mut clock: C, cancel: CancellationToken) -> Result<()>
    where
        C: FnMut() -> u64,
    {
        info!(source = self.source.name(), "source driver started");
        loop {
            self.tick(clock())?;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep_until(self.next_wakeup()) => {}
            }
        }
        let flushed = self.push(clock())?;
        info!(
            source = self.source.name(),
            flushed_batches = flushed,
            retained_rows = self.table.occupancy(),
            "source driver stopped"
        );
        Ok(())
    }

    fn next_wakeup(&self) -> Instant {
        self.cadence
            .next_wakeup()
            .max(Instant::now() + MIN_WAKEUP_INTERVAL)
    }
}
