//! Segment snapshot scan boundary
//!
//! The storage layer streams the entries present when a listener registers,
//! segment by segment, with the listener's filter and converter applied at the
//! source. The notification core never re-applies them to scan output.

mod memory;
pub use memory::*;


use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::BoxStream;
#[cfg(test)]
use mockall::automock;

use crate::cluster::KeyPartitioner;
use crate::cluster::SegmentId;
use crate::CacheEventConverter;
use crate::CacheEventFilter;
use crate::ListenerId;
use crate::Metadata;
use crate::Result;

/// One element of a snapshot scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanItem {
    /// An entry that passed the pushed-down filter. `value` is already
    /// converted and is `None` when the converter dropped it.
    Entry {
        segment: SegmentId,
        key: Bytes,
        value: Option<Bytes>,
        metadata: Option<Metadata>,
    },
    /// Every entry of the segment has been yielded
    SegmentComplete(SegmentId),
    /// The scan is over
    Complete,
}

/// Scan parameters for one registration
#[derive(Clone)]
pub struct ScanRequest {
    pub listener_id: ListenerId,
    pub filter: Option<Arc<dyn CacheEventFilter>>,
    pub converter: Option<Arc<dyn CacheEventConverter>>,
}

impl fmt::Debug for ScanRequest {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ScanRequest")
            .field("listener_id", &self.listener_id)
            .field("has_filter", &self.filter.is_some())
            .field("has_converter", &self.converter.is_some())
            .finish()
    }
}

#[cfg_attr(test, automock)]
pub trait SegmentSnapshotScan: Send + Sync + 'static {
    /// Key placement the scan's segment numbers follow.
    ///
    /// The engine files captured live events under the same segments, so a
    /// scan returning `None` must be paired with an explicit partitioner on
    /// the builder.
    fn partitioner(&self) -> Option<Arc<dyn KeyPartitioner>> {
        None
    }

    /// Starts a scan of the local segments.
    ///
    /// The stream may end without [`ScanItem::Complete`]; that counts as
    /// completion. An `Err` item aborts the transfer.
    fn scan(
        &self,
        request: ScanRequest,
    ) -> BoxStream<'static, Result<ScanItem>>;
}
