//! Clustered event boundary
//!
//! The notification core only reaches other members through the narrow traits
//! defined here. Retry, batching windows and wire serialization belong to the
//! transport implementing [`ClusterEventManager`]; ownership decisions belong to
//! the distribution layer implementing [`OwnershipOracle`] and
//! [`KeyPartitioner`].

mod local;
mod partitioner;
pub use local::*;
pub use partitioner::*;


use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;

use crate::EntryEvent;
use crate::ListenerId;
use crate::Result;

/// Cluster member identifier
pub type MemberId = u32;

/// Storage segment identifier
pub type SegmentId = u32;

/// A post-phase event addressed to one clustered listener on its origin member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterEvent {
    pub listener_id: ListenerId,
    pub event: EntryEvent,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterEventManager: Send + Sync + 'static {
    /// Ships a batch of post-phase events to the member hosting the listeners.
    ///
    /// # Errors
    /// Returns [`crate::ClusterError::SendFailure`] when the transport gives up on
    /// the batch. The core only logs the failure.
    async fn send(
        &self,
        batch: Vec<ClusterEvent>,
        audience: MemberId,
    ) -> Result<()>;
}

#[cfg_attr(test, automock)]
pub trait OwnershipOracle: Send + Sync + 'static {
    /// Whether this member is the primary owner of `key` right now
    fn is_primary_owner(
        &self,
        key: &Bytes,
    ) -> bool;
}

#[cfg_attr(test, automock)]
pub trait KeyPartitioner: Send + Sync + 'static {
    fn segment_of(
        &self,
        key: &Bytes,
    ) -> SegmentId;

    fn num_segments(&self) -> u32;
}

/// Groups remote-bound clustered events by the member that must receive them.
///
/// One batch per member and publish call, split when it exceeds `max_batch_size`.
#[derive(Debug, Default)]
pub(crate) struct ClusterBatches {
    batches: BTreeMap<MemberId, Vec<ClusterEvent>>,
}

impl ClusterBatches {
    pub(crate) fn push(
        &mut self,
        audience: MemberId,
        event: ClusterEvent,
    ) {
        self.batches.entry(audience).or_default().push(event);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub(crate) fn into_batches(
        self,
        max_batch_size: usize,
    ) -> Vec<(MemberId, Vec<ClusterEvent>)> {
        let max_batch_size = max_batch_size.max(1);
        let mut out = Vec::new();
        for (audience, events) in self.batches {
            if events.len() <= max_batch_size {
                out.push((audience, events));
                continue;
            }
            let mut events = events.into_iter().peekable();
            while events.peek().is_some() {
                out.push((audience, events.by_ref().take(max_batch_size).collect()));
            }
        }
        out
    }
}
