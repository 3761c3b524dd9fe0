use std::time::Duration;

use anyhow::bail;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::trace;

/// Tracks one periodic action: whether its cycle has elapsed, and how many cycles have run.
///
/// Uses tokio's monotonic clock so a paused test runtime controls it. Not thread-safe.
#[derive(Debug, Clone)]
pub struct CycleTimer {
    period: Duration,
    next: Instant,
    count: u32,
}

impl CycleTimer {
    /// A new timer is expired right away; its first deadline is set by the first `reset`.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now(),
            count: 0,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.next
    }

    /// Ends the current cycle and starts the next one.
    pub fn reset(&mut self) {
        self.next = Instant::now() + self.period;
        self.count = self.count.wrapping_add(1);
    }

    /// Affects deadlines set by later `reset` calls. A zero period expires on every check.
    pub fn set_period(&mut self, period: Duration) {
        self.period = period;
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next(&self) -> Instant {
        self.next
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

impl Default for CycleTimer {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

/// Sampling and push cadence of one data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub sampling_period_ms: u64,
    pub push_period_ms: u64,
    /// Push early once the table holds this fraction of its target capacity.
    pub push_occupancy_pct_threshold: f64,
    /// Push early once the table holds this many rows.
    pub push_occupancy_threshold: usize,
}

impl CadenceConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.push_occupancy_pct_threshold.is_finite() || self.push_occupancy_pct_threshold <= 0.0 {
            bail!("push_occupancy_pct_threshold must be a positive number");
        }
        if self.push_occupancy_threshold == 0 {
            bail!("push_occupancy_threshold must be > 0");
        }
        Ok(())
    }

    pub fn sampling_period(&self) -> Duration {
        Duration::from_millis(self.sampling_period_ms)
    }

    pub fn push_period(&self) -> Duration {
        Duration::from_millis(self.push_period_ms)
    }
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            sampling_period_ms: 100,
            push_period_ms: 1000,
            push_occupancy_pct_threshold: 0.5,
            push_occupancy_threshold: 4096,
        }
    }
}

/// Decides when a source should be sampled and when its table should be drained.
///
/// Drains follow the push timer, but occupancy above either threshold forces one early so
/// tables stay bounded when a source is busier than its push period assumes.
#[derive(Debug, Clone)]
pub struct CadenceController {
    sampling: CycleTimer,
    push: CycleTimer,
    push_occupancy_pct_threshold: f64,
    push_occupancy_threshold: usize,
}

impl CadenceController {
    pub fn new(config: &CadenceConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            sampling: CycleTimer::new(config.sampling_period()),
            push: CycleTimer::new(config.push_period()),
            push_occupancy_pct_threshold: config.push_occupancy_pct_threshold,
            push_occupancy_threshold: config.push_occupancy_threshold,
        })
    }

    pub fn sampling_due(&self) -> bool {
        self.sampling.expired()
    }

    pub fn mark_sampled(&mut self) {
        self.sampling.reset();
    }

    pub fn push_due(&self, occupancy_pct: f64, occupancy: usize) -> bool {
        if self.push.expired() {
            trace!("push due: period elapsed");
            return true;
        }
        if occupancy_pct >= self.push_occupancy_pct_threshold {
            trace!(occupancy_pct, "push due: occupancy fraction");
            return true;
        }
        if occupancy >= self.push_occupancy_threshold {
            trace!(occupancy, "push due: occupancy count");
            return true;
        }
        false
    }

    pub fn mark_pushed(&mut self) {
        self.push.reset();
    }

    pub fn next_sampling_time(&self) -> Instant {
        self.sampling.next()
    }

    pub fn next_push_time(&self) -> Instant {
        self.push.next()
    }

    /// The earlier of the two deadlines: when the driving loop next has work to do.
    pub fn next_wakeup(&self) -> Instant {
        self.next_sampling_time().min(self.next_push_time())
    }

    pub fn set_sampling_period(&mut self, period: Duration) {
        self.sampling.set_period(period);
    }

    pub fn set_push_period(&mut self, period: Duration) {
        self.push.set_period(period);
    }

    pub fn sampling_period(&self) -> Duration {
        self.sampling.period()
    }

    pub fn push_period(&self) -> Duration {
        self.push.period()
    }

    pub fn sampling_count(&self) -> u32 {
        self.sampling.count()
    }

    pub fn push_count(&self) -> u32 {
        self.push.count()
    }
}
