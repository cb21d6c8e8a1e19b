use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClusterEventsConfig {
    /// Upper bound of events per batch handed to the cluster event manager.
    /// Larger batches are split, preserving order.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

impl Default for ClusterEventsConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
        }
    }
}

impl ClusterEventsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "cluster_events.max_batch_size must be greater than 0".into(),
            )));
        }
        Ok(())
    }
}

fn default_max_batch_size() -> usize {
    512
}
