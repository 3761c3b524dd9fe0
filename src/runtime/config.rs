use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::runtime::cadence::CadenceConfig;
use crate::storage::config::DataTableConfig;

/// Everything a `SourceDriver` needs besides the source and sink. Missing keys take defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub table: DataTableConfig,
    pub cadence: CadenceConfig,
}

impl SourceConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s).context("failed to parse source config json")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(s).context("failed to parse source config yaml")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.table.validate().context("table")?;
        self.cadence.validate().context("cadence")?;
        Ok(())
    }
}
