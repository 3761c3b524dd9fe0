use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Rows each new tablet column reserves up front. Not a cap.
pub const DEFAULT_TARGET_CAPACITY: usize = 1024;

/// Tuning knobs of a `DataTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataTableConfig {
    /// Initial reservation for every column of a freshly created tablet. Also the
    /// denominator of `DataTable::occupancy_pct`.
    pub target_capacity: usize,
}

impl DataTableConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.target_capacity == 0 {
            bail!("target_capacity must be > 0");
        }
        Ok(())
    }
}

impl Default for DataTableConfig {
    fn default() -> Self {
        Self {
            target_capacity: DEFAULT_TARGET_CAPACITY,
        }
    }
}
