use std::sync::Arc;

use config::ConfigError;

use super::Dispatcher;
use super::NotificationEngine;
use crate::cluster::ClusterEventManager;
use crate::cluster::HashKeyPartitioner;
use crate::cluster::KeyPartitioner;
use crate::cluster::LocalOwnership;
use crate::cluster::OwnershipOracle;
use crate::scan::MemorySnapshotScan;
use crate::scan::SegmentSnapshotScan;
use crate::Error;
use crate::NotifierConfig;
use crate::Result;

/// Assembles a [`NotificationEngine`] from its collaborators.
///
/// Anything left unset falls back to a single member setup: this member owns
/// every key, keys are hashed onto `cluster.num_segments` segments and the
/// snapshot source is an empty [`MemorySnapshotScan`].
///
/// The engine and the snapshot scan share one [`KeyPartitioner`]. A scan that
/// exposes its partitioner lends it to the engine; any other scan needs an
/// explicit [`Self::partitioner`].
///
/// ```ignore
/// let engine = NotifierBuilder::new(NotifierConfig::new()?)
///     .ownership(Arc::new(my_topology))
///     .snapshot_scan(Arc::new(my_store))
///     .cluster_events(Arc::new(my_transport))
///     .build()?;
/// engine.start()?;
/// ```
pub struct NotifierBuilder {
    config: NotifierConfig,
    ownership: Option<Arc<dyn OwnershipOracle>>,
    partitioner: Option<Arc<dyn KeyPartitioner>>,
    scan: Option<Arc<dyn SegmentSnapshotScan>>,
    cluster_events: Option<Arc<dyn ClusterEventManager>>,
}

impl NotifierBuilder {
    pub fn new(config: NotifierConfig) -> Self {
        Self {
            config,
            ownership: None,
            partitioner: None,
            scan: None,
            cluster_events: None,
        }
    }

    pub fn ownership(
        mut self,
        ownership: Arc<dyn OwnershipOracle>,
    ) -> Self {
        self.ownership = Some(ownership);
        self
    }

    pub fn partitioner(
        mut self,
        partitioner: Arc<dyn KeyPartitioner>,
    ) -> Self {
        self.partitioner = Some(partitioner);
        self
    }

    pub fn snapshot_scan(
        mut self,
        scan: Arc<dyn SegmentSnapshotScan>,
    ) -> Self {
        self.scan = Some(scan);
        self
    }

    pub fn cluster_events(
        mut self,
        cluster_events: Arc<dyn ClusterEventManager>,
    ) -> Self {
        self.cluster_events = Some(cluster_events);
        self
    }

    /// Validates the configuration and builds the engine, not yet started.
    ///
    /// # Errors
    /// [`Error::Config`] when the configuration is invalid, or when the key
    /// placement of the snapshot scan is unknown or differs from the explicit
    /// partitioner.
    pub fn build(self) -> Result<NotificationEngine> {
        let config = self.config.validate()?;

        let (partitioner, scan) = match self.scan {
            Some(scan) => {
                let partitioner = shared_partitioner(self.partitioner, scan.partitioner())?;
                (partitioner, scan)
            }
            None => {
                let partitioner = self
                    .partitioner
                    .unwrap_or_else(|| Arc::new(HashKeyPartitioner::new(config.cluster.num_segments)));
                let scan: Arc<dyn SegmentSnapshotScan> = Arc::new(MemorySnapshotScan::new(partitioner.clone()));
                (partitioner, scan)
            }
        };
        let ownership = self.ownership.unwrap_or_else(|| Arc::new(LocalOwnership));

        let dispatcher = Dispatcher::new(
            config.cluster.local_member,
            ownership,
            config.cluster_events.max_batch_size,
        );
        Ok(NotificationEngine::new(
            config,
            dispatcher,
            partitioner,
            scan,
            self.cluster_events,
        ))
    }
}

/// Picks the one partitioner both the engine and a supplied scan follow
fn shared_partitioner(
    explicit: Option<Arc<dyn KeyPartitioner>>,
    from_scan: Option<Arc<dyn KeyPartitioner>>,
) -> Result<Arc<dyn KeyPartitioner>> {
    match (explicit, from_scan) {
        (Some(explicit), Some(from_scan)) => {
            if Arc::as_ptr(&explicit) as *const () != Arc::as_ptr(&from_scan) as *const () {
                return Err(Error::Config(ConfigError::Message(
                    "partitioner differs from the one the snapshot scan places keys with".into(),
                )));
            }
            Ok(from_scan)
        }
        (None, Some(from_scan)) => Ok(from_scan),
        (Some(explicit), None) => Ok(explicit),
        (None, None) => Err(Error::Config(ConfigError::Message(
            "snapshot scan does not expose its partitioner; set one on the builder".into(),
        ))),
    }
}
