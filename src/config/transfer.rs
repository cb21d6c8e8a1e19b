use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Initial state transfer settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransferConfig {
    /// Yield back to the runtime after this many scanned entries
    #[serde(default = "default_yield_every_n_entries")]
    pub yield_every_n_entries: usize,

    /// Captured events per segment above which a warning is logged.
    /// 0 disables it.
    #[serde(default = "default_segment_queue_warn_threshold")]
    pub segment_queue_warn_threshold: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            yield_every_n_entries: default_yield_every_n_entries(),
            segment_queue_warn_threshold: default_segment_queue_warn_threshold(),
        }
    }
}

impl TransferConfig {
    pub fn validate(&self) -> Result<()> {
        if self.yield_every_n_entries == 0 {
            return Err(Error::Config(ConfigError::Message(
                "transfer.yield_every_n_entries must be greater than 0".into(),
            )));
        }
        Ok(())
    }
}

fn default_yield_every_n_entries() -> usize {
    128
}

fn default_segment_queue_warn_threshold() -> usize {
    1024
}
