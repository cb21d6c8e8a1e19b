use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use parking_lot::RwLock;
use tracing::trace;

use super::ScanItem;
use super::ScanRequest;
use super::SegmentSnapshotScan;
use crate::cluster::KeyPartitioner;
use crate::cluster::SegmentId;
use crate::EntryEvent;
use crate::Metadata;
use crate::Result;

type Segment = BTreeMap<Bytes, (Bytes, Option<Metadata>)>;

/// Segment-partitioned in-memory snapshot source.
///
/// A scan copies the matching entries when it starts, so later writes never
/// show up in an ongoing scan.
pub struct MemorySnapshotScan {
    partitioner: Arc<dyn KeyPartitioner>,
    segments: RwLock<BTreeMap<SegmentId, Segment>>,
}

impl MemorySnapshotScan {
    pub fn new(partitioner: Arc<dyn KeyPartitioner>) -> Self {
        Self {
            partitioner,
            segments: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn insert(
        &self,
        key: Bytes,
        value: Bytes,
        metadata: Option<Metadata>,
    ) -> Option<Bytes> {
        let segment = self.partitioner.segment_of(&key);
        self.segments
            .write()
            .entry(segment)
            .or_default()
            .insert(key, (value, metadata))
            .map(|(old, _)| old)
    }

    pub fn remove(
        &self,
        key: &Bytes,
    ) -> Option<Bytes> {
        let segment = self.partitioner.segment_of(key);
        let mut segments = self.segments.write();
        let removed = segments.get_mut(&segment)?.remove(key).map(|(old, _)| old);
        if segments.get(&segment).map(|s| s.is_empty()).unwrap_or(false) {
            segments.remove(&segment);
        }
        removed
    }

    pub fn get(
        &self,
        key: &Bytes,
    ) -> Option<Bytes> {
        let segment = self.partitioner.segment_of(key);
        self.segments.read().get(&segment)?.get(key).map(|(v, _)| v.clone())
    }

    pub fn len(&self) -> usize {
        self.segments.read().values().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(
        &self,
        request: &ScanRequest,
    ) -> Vec<ScanItem> {
        let segments = self.segments.read();
        let entries: usize = segments.values().map(|s| s.len()).sum();
        let mut items = Vec::with_capacity(entries + self.partitioner.num_segments() as usize + 1);

        for segment in 0..self.partitioner.num_segments() {
            if let Some(entries) = segments.get(&segment) {
                for (key, (value, metadata)) in entries {
                    let event = EntryEvent::created(key.clone(), value.clone(), metadata.clone(), false, true);
                    if let Some(filter) = &request.filter {
                        if !filter.accept(&event) {
                            continue;
                        }
                    }
                    let value = match &request.converter {
                        Some(converter) => converter.convert(&event),
                        None => Some(value.clone()),
                    };
                    items.push(ScanItem::Entry {
                        segment,
                        key: key.clone(),
                        value,
                        metadata: metadata.clone(),
                    });
                }
            }
            items.push(ScanItem::SegmentComplete(segment));
        }
        items.push(ScanItem::Complete);
        items
    }
}

impl SegmentSnapshotScan for MemorySnapshotScan {
    fn partitioner(&self) -> Option<Arc<dyn KeyPartitioner>> {
        Some(self.partitioner.clone())
    }

    fn scan(
        &self,
        request: ScanRequest,
    ) -> BoxStream<'static, Result<ScanItem>> {
        let items = self.snapshot(&request);
        trace!(listener_id = request.listener_id, items = items.len(), "Snapshot scan started");
        stream::iter(items.into_iter().map(Ok)).boxed()
    }
}
