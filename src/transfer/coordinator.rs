use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use tracing::debug;
use tracing::trace;

use super::Sequenced;
use super::TransferState;
use crate::cluster::SegmentId;
use crate::config::TransferConfig;
use crate::listener::Registration;
use crate::metrics::SYNTHETIC_EVENTS;
use crate::notifier::Dispatcher;
use crate::notifier::Runtime;
use crate::scan::ScanItem;
use crate::scan::ScanRequest;
use crate::scan::SegmentSnapshotScan;
use crate::EntryEvent;
use crate::ListenerId;
use crate::Event;
use crate::Metadata;
use crate::Result;
use crate::TransferError;

/// Drives the initial state transfer of one registration.
///
/// The registration must already be indexed with `state` armed, so every live
/// event published from here on is either captured or delivered directly.
pub(crate) struct TransferCoordinator<'a> {
    dispatcher: &'a Dispatcher,
    rt: &'a Runtime,
    scan: &'a dyn SegmentSnapshotScan,
    config: &'a TransferConfig,
}

impl<'a> TransferCoordinator<'a> {
    pub(crate) fn new(
        dispatcher: &'a Dispatcher,
        rt: &'a Runtime,
        scan: &'a dyn SegmentSnapshotScan,
        config: &'a TransferConfig,
    ) -> Self {
        Self {
            dispatcher,
            rt,
            scan,
            config,
        }
    }

    pub(crate) async fn run(
        &self,
        registration: &Arc<Registration>,
        state: &TransferState,
    ) -> Result<()> {
        let listener_id = registration.id;
        let mut stream = self.scan.scan(ScanRequest {
            listener_id,
            filter: registration.filter.clone(),
            converter: registration.converter.clone(),
        });
        debug!(listener_id, "Initial state transfer started");

        let mut scanned = 0usize;
        let mut synthetic = 0usize;
        loop {
            let item = tokio::select! {
                biased;
                _ = registration.cancel.cancelled() => {
                    return Err(TransferError::Aborted { listener_id }.into());
                }
                item = stream.next() => item,
            };

            match item {
                None | Some(Ok(ScanItem::Complete)) => break,
                Some(Err(e)) => {
                    return Err(TransferError::ScanFailed {
                        listener_id,
                        source: Box::new(e),
                    }
                    .into());
                }
                Some(Ok(ScanItem::Entry {
                    segment,
                    key,
                    value,
                    metadata,
                })) => {
                    scanned += 1;
                    let expected = state.segment_of(&key);
                    if segment != expected {
                        return Err(misplaced(listener_id, format!(
                            "scan yielded key {key:?} in segment {segment}, the engine places it in segment {expected}"
                        )));
                    }
                    if state.is_superseded(&key) {
                        trace!(listener_id, segment, ?key, "Snapshot entry superseded by a live event");
                    } else {
                        self.emit_synthetic(registration, key, value, metadata)?;
                        synthetic += 1;
                    }
                    if scanned % self.config.yield_every_n_entries.max(1) == 0 {
                        tokio::task::yield_now().await;
                    }
                }
                Some(Ok(ScanItem::SegmentComplete(segment))) => {
                    if segment as usize >= state.num_segments() {
                        return Err(misplaced(listener_id, format!(
                            "scan completed segment {segment} of {}",
                            state.num_segments()
                        )));
                    }
                    self.drain_segment(registration, state, segment)?;
                }
            }
        }

        self.drain_remaining(registration, state)?;
        debug!(listener_id, scanned, synthetic, "Initial state transfer completed");
        Ok(())
    }

    /// Synthetic created events: pre and post for local listeners, post only
    /// for clustered ones
    fn emit_synthetic(
        &self,
        registration: &Arc<Registration>,
        key: Bytes,
        value: Option<Bytes>,
        metadata: Option<Metadata>,
    ) -> Result<()> {
        if !registration.clustered {
            let pre = EntryEvent::created(key.clone(), Bytes::new(), metadata.clone(), true, true);
            self.dispatcher.deliver_now(self.rt, registration, Event::Entry(pre))?;
            SYNTHETIC_EVENTS.inc();
        }
        let post = EntryEvent::created(key, Bytes::new(), metadata, false, true).with_observed_value(value);
        self.dispatcher.deliver_now(self.rt, registration, Event::Entry(post))?;
        SYNTHETIC_EVENTS.inc();
        Ok(())
    }

    fn drain_segment(
        &self,
        registration: &Arc<Registration>,
        state: &TransferState,
        segment: SegmentId,
    ) -> Result<()> {
        while let Some(batch) = state.drain_segment_batch(segment) {
            trace!(listener_id = registration.id, segment, events = batch.len(), "Draining captured events");
            self.deliver_batch(registration, batch)?;
        }
        Ok(())
    }

    fn drain_remaining(
        &self,
        registration: &Arc<Registration>,
        state: &TransferState,
    ) -> Result<()> {
        while let Some(batch) = state.drain_remaining_batch() {
            trace!(listener_id = registration.id, events = batch.len(), "Draining remaining captured events");
            self.deliver_batch(registration, batch)?;
        }
        Ok(())
    }

    fn deliver_batch(
        &self,
        registration: &Arc<Registration>,
        batch: Vec<Sequenced>,
    ) -> Result<()> {
        for (_, event) in batch {
            if registration.cancel.is_cancelled() {
                return Err(TransferError::Aborted {
                    listener_id: registration.id,
                }
                .into());
            }
            self.dispatcher.deliver_now(self.rt, registration, event)?;
        }
        Ok(())
    }
}

/// The scan and the engine disagree on key placement; captured events would
/// be drained against the wrong segment
fn misplaced(
    listener_id: ListenerId,
    reason: String,
) -> crate::Error {
    TransferError::ScanFailed {
        listener_id,
        source: reason.into(),
    }
    .into()
}
