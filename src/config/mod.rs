//! Configuration for the notification engine.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Section-wise validation
mod cluster;
mod cluster_events;
mod notification;
mod transfer;
pub use cluster::*;
pub use cluster_events::*;
pub use notification::*;
pub use transfer::*;


use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Environment variable prefix, e.g. `NOTIFY__TRANSFER__YIELD_EVERY_N_ENTRIES`
pub(crate) const ENV_PREFIX: &str = "NOTIFY";

/// Main configuration container for the notification engine
///
/// Sources are merged with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct NotifierConfig {
    /// Local member identity and segment layout
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Listener delivery settings
    #[serde(default)]
    pub notification: NotificationConfig,
    /// Initial state transfer settings
    #[serde(default)]
    pub transfer: TransferConfig,
    /// Clustered event shipping settings
    #[serde(default)]
    pub cluster_events: ClusterEventsConfig,
}

impl Debug for NotifierConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("cluster", &self.cluster)
            .field("notification", &self.notification)
            .finish_non_exhaustive()
    }
}

impl NotifierConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `NOTIFY__` prefix (highest priority)
    ///
    /// Callers must call `validate()` once all overrides are applied.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("NOTIFY__CLUSTER__LOCAL_MEMBER", "3");
    /// let cfg = NotifierConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    ///
    /// # Example
    /// ```ignore
    /// let config = NotifierConfig::new()?
    ///     .with_override_config("notifier.toml")?
    ///     .validate()?;
    /// ```
    pub fn validate(self) -> Result<Self> {
        self.cluster.validate()?;
        self.notification.validate()?;
        self.transfer.validate()?;
        self.cluster_events.validate()?;
        Ok(self)
    }
}
