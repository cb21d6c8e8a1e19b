use std::sync::Arc;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::SuffixPartitioner;
use crate::KeyPartitioner;
use crate::Metadata;
use crate::Result;
use crate::ScanItem;
use crate::ScanRequest;
use crate::SegmentId;
use crate::SegmentSnapshotScan;

/// A snapshot scan the test feeds item by item, after it has been requested
pub(crate) struct ScriptedScan {
    partitioner: Option<Arc<dyn KeyPartitioner>>,
    items: Mutex<Option<mpsc::UnboundedReceiver<Result<ScanItem>>>>,
    requested: Mutex<Option<oneshot::Sender<ScanRequest>>>,
}

pub(crate) struct ScanDriver {
    items: mpsc::UnboundedSender<Result<ScanItem>>,
    requested: Option<oneshot::Receiver<ScanRequest>>,
}

/// A scripted scan placing keys like [`SuffixPartitioner`] over 4 segments
pub(crate) fn scripted_scan() -> (ScriptedScan, ScanDriver) {
    scripted_scan_with(Some(SuffixPartitioner::new(4)))
}

/// A scripted scan exposing `partitioner` as its key placement
pub(crate) fn scripted_scan_with(partitioner: Option<Arc<dyn KeyPartitioner>>) -> (ScriptedScan, ScanDriver) {
    let (items_tx, items_rx) = mpsc::unbounded_channel();
    let (requested_tx, requested_rx) = oneshot::channel();
    (
        ScriptedScan {
            partitioner,
            items: Mutex::new(Some(items_rx)),
            requested: Mutex::new(Some(requested_tx)),
        },
        ScanDriver {
            items: items_tx,
            requested: Some(requested_rx),
        },
    )
}

impl SegmentSnapshotScan for ScriptedScan {
    fn partitioner(&self) -> Option<Arc<dyn KeyPartitioner>> {
        self.partitioner.clone()
    }

    fn scan(
        &self,
        request: ScanRequest,
    ) -> BoxStream<'static, Result<ScanItem>> {
        if let Some(tx) = self.requested.lock().take() {
            let _ = tx.send(request);
        }
        match self.items.lock().take() {
            Some(rx) => UnboundedReceiverStream::new(rx).boxed(),
            None => futures::stream::empty().boxed(),
        }
    }
}

impl ScanDriver {
    /// Resolves once the transfer is armed and has requested its scan
    pub(crate) async fn requested(&mut self) -> ScanRequest {
        self.requested
            .take()
            .expect("requested() called twice")
            .await
            .expect("scan dropped before it was requested")
    }

    pub(crate) fn entry(
        &self,
        segment: SegmentId,
        key: Bytes,
        value: Bytes,
        metadata: Option<Metadata>,
    ) {
        self.send(Ok(ScanItem::Entry {
            segment,
            key,
            value: Some(value),
            metadata,
        }));
    }

    pub(crate) fn segment_complete(
        &self,
        segment: SegmentId,
    ) {
        self.send(Ok(ScanItem::SegmentComplete(segment)));
    }

    pub(crate) fn complete(&self) {
        self.send(Ok(ScanItem::Complete));
    }

    pub(crate) fn send(
        &self,
        item: Result<ScanItem>,
    ) {
        self.items.send(item).expect("scan stream dropped");
    }
}
