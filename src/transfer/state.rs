use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::warn;

use crate::cluster::KeyPartitioner;
use crate::cluster::SegmentId;
use crate::metrics::EVENTS_CAPTURED;
use crate::Event;
use crate::ListenerId;

pub(crate) type Sequenced = (u64, Event);

#[derive(Default)]
struct SegmentQueue {
    scanned: bool,
    queue: VecDeque<Sequenced>,
    /// Keys with a live event seen since the transfer was armed
    keys: HashSet<Bytes>,
}

#[derive(Default)]
struct GlobalQueue {
    finished: bool,
    queue: VecDeque<Sequenced>,
}

/// Live events captured for one registration while its initial state is
/// being transferred.
///
/// Entry events are queued per segment until that segment has been scanned;
/// keyless events wait in the global queue until the whole transfer ends.
pub(crate) struct TransferState {
    listener_id: ListenerId,
    partitioner: Arc<dyn KeyPartitioner>,
    segments: Vec<Mutex<SegmentQueue>>,
    global: Mutex<GlobalQueue>,
    next_seq: AtomicU64,
    queue_warn_threshold: usize,
}

impl TransferState {
    pub(crate) fn new(
        listener_id: ListenerId,
        partitioner: Arc<dyn KeyPartitioner>,
        queue_warn_threshold: usize,
    ) -> Self {
        let segments = (0..partitioner.num_segments()).map(|_| Mutex::new(SegmentQueue::default())).collect();
        Self {
            listener_id,
            partitioner,
            segments,
            global: Mutex::new(GlobalQueue::default()),
            next_seq: AtomicU64::new(0),
            queue_warn_threshold,
        }
    }

    pub(crate) fn segment_of(
        &self,
        key: &Bytes,
    ) -> SegmentId {
        self.partitioner.segment_of(key)
    }

    pub(crate) fn num_segments(&self) -> usize {
        self.segments.len()
    }

    fn segment(
        &self,
        key: &Bytes,
    ) -> Option<&Mutex<SegmentQueue>> {
        self.segments.get(self.partitioner.segment_of(key) as usize)
    }

    /// Queues `event` unless its segment was already scanned.
    ///
    /// Hands the event back when it must be delivered directly.
    pub(crate) fn try_capture(
        &self,
        event: Event,
    ) -> std::result::Result<(), Event> {
        let key = event.key().cloned();
        match key {
            Some(key) => {
                let Some(segment) = self.segment(&key) else {
                    return Err(event);
                };
                let mut segment = segment.lock();
                if segment.scanned {
                    return Err(event);
                }
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                segment.keys.insert(key);
                segment.queue.push_back((seq, event));
                self.check_queue_len(segment.queue.len());
            }
            None => {
                let mut global = self.global.lock();
                if global.finished {
                    return Err(event);
                }
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                global.queue.push_back((seq, event));
                self.check_queue_len(global.queue.len());
            }
        }
        EVENTS_CAPTURED.inc();
        Ok(())
    }

    /// Records a live event for `key` that was not delivered to the listener.
    ///
    /// The key's snapshot value is stale from now on, so no synthetic event
    /// may be produced for it.
    pub(crate) fn supersede(
        &self,
        key: &Bytes,
    ) {
        if let Some(segment) = self.segment(key) {
            let mut segment = segment.lock();
            if !segment.scanned {
                segment.keys.insert(key.clone());
            }
        }
    }

    /// Whether a live event already superseded the snapshot value of `key`
    pub(crate) fn is_superseded(
        &self,
        key: &Bytes,
    ) -> bool {
        self.segment(key).map(|s| s.lock().keys.contains(key)).unwrap_or(false)
    }

    /// Takes the queued events of `segment`, or marks it scanned when nothing
    /// is queued. Returns `None` once the segment is scanned.
    pub(crate) fn drain_segment_batch(
        &self,
        segment: SegmentId,
    ) -> Option<Vec<Sequenced>> {
        let mut segment = self.segments.get(segment as usize)?.lock();
        if segment.scanned {
            return None;
        }
        if segment.queue.is_empty() {
            segment.scanned = true;
            segment.keys.clear();
            return None;
        }
        Some(segment.queue.drain(..).collect())
    }

    /// Takes everything still queued across unfinished segments and the global
    /// queue, merged by arrival. Marks all of them finished when nothing is left.
    pub(crate) fn drain_remaining_batch(&self) -> Option<Vec<Sequenced>> {
        // Fixed lock order: segments ascending, then global.
        let mut segments: Vec<_> = self.segments.iter().map(|s| s.lock()).collect();
        let mut global = self.global.lock();

        let mut batch: Vec<Sequenced> = Vec::new();
        for segment in segments.iter_mut().filter(|s| !s.scanned) {
            batch.extend(segment.queue.drain(..));
        }
        if !global.finished {
            batch.extend(global.queue.drain(..));
        }

        if batch.is_empty() {
            for segment in segments.iter_mut() {
                segment.scanned = true;
                segment.keys.clear();
            }
            global.finished = true;
            return None;
        }
        batch.sort_by_key(|(seq, _)| *seq);
        Some(batch)
    }

    fn check_queue_len(
        &self,
        len: usize,
    ) {
        if self.queue_warn_threshold > 0 && len == self.queue_warn_threshold {
            warn!(
                listener_id = self.listener_id,
                queued = len,
                "Initial transfer queue is growing; the segment scan may be slow"
            );
        }
    }
}
