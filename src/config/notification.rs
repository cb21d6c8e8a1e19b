use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Listener delivery settings
///
/// ```toml
/// [notification]
/// async_workers = 4
/// async_queue_warn_threshold = 10000
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Worker tasks delivering to asynchronous listeners.
    ///
    /// Events for the same listener and key always land on the same worker,
    /// which keeps them in publish order.
    #[serde(default = "default_async_workers")]
    pub async_workers: usize,

    /// Pending jobs per worker above which a warning is logged. 0 disables it.
    #[serde(default = "default_async_queue_warn_threshold")]
    pub async_queue_warn_threshold: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            async_workers: default_async_workers(),
            async_queue_warn_threshold: default_async_queue_warn_threshold(),
        }
    }
}

impl NotificationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.async_workers == 0 {
            return Err(Error::Config(ConfigError::Message(
                "notification.async_workers must be greater than 0".into(),
            )));
        }
        Ok(())
    }
}

fn default_async_workers() -> usize {
    4
}

fn default_async_queue_warn_threshold() -> usize {
    10_000
}
