use std::sync::Arc;

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::async_executor::AsyncExecutor;
use crate::cluster::ClusterBatches;
use crate::cluster::ClusterEvent;
use crate::cluster::ClusterEventManager;
use crate::cluster::OwnershipOracle;
use crate::constants::MODE_CLUSTER;
use crate::constants::MODE_SYNC;
use crate::listener::ListenerRegistry;
use crate::listener::Registration;
use crate::metrics::CLUSTER_SEND_FAILURES;
use crate::metrics::DELIVERY_FAILURES;
use crate::metrics::EVENTS_DELIVERED;
use crate::metrics::EVENTS_PUBLISHED;
use crate::BoxError;
use crate::DeliveryError;
use crate::EntryEvent;
use crate::Event;
use crate::Listener;
use crate::MemberId;
use crate::Result;

/// Invokes every handler `listener` bound to the event's type.
///
/// All handlers run; the first failure is returned.
pub(crate) fn invoke_listener(
    listener: &Listener,
    event: &Event,
) -> std::result::Result<(), BoxError> {
    let mut first_error = None;
    for handler in listener.handlers_for(event.event_type()) {
        if let Err(e) = handler.invoke(event) {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Resources that only exist while the engine is running
pub(crate) struct Runtime {
    executor: AsyncExecutor,
    cluster_tx: Option<mpsc::UnboundedSender<(MemberId, Vec<ClusterEvent>)>>,
}

impl Runtime {
    pub(crate) fn start(
        handle: Handle,
        async_workers: usize,
        async_queue_warn_threshold: usize,
        cluster_events: Option<Arc<dyn ClusterEventManager>>,
    ) -> Self {
        let executor = AsyncExecutor::start(&handle, async_workers, async_queue_warn_threshold);
        let cluster_tx = cluster_events.map(|manager| {
            let (tx, rx) = mpsc::unbounded_channel();
            handle.spawn(ship_cluster_batches(manager, rx));
            tx
        });
        Self { executor, cluster_tx }
    }
}

/// Sends batches one at a time so a member receives them in publish order
async fn ship_cluster_batches(
    manager: Arc<dyn ClusterEventManager>,
    mut rx: mpsc::UnboundedReceiver<(MemberId, Vec<ClusterEvent>)>,
) {
    while let Some((audience, batch)) = rx.recv().await {
        let events = batch.len();
        match manager.send(batch, audience).await {
            Ok(()) => EVENTS_DELIVERED.with_label_values(&[MODE_CLUSTER]).inc_by(events as u64),
            Err(e) => {
                CLUSTER_SEND_FAILURES.inc();
                warn!(audience, events, error = %e, "Failed to ship clustered events");
            }
        }
    }
    trace!("Cluster event shipper stopped");
}

/// Applies the per-registration delivery rules to published events
pub(crate) struct Dispatcher {
    pub(crate) registry: ListenerRegistry,
    local_member: MemberId,
    ownership: Arc<dyn OwnershipOracle>,
    max_batch_size: usize,
}

/// Lazily evaluated ownership of the key being dispatched
struct Ownership<'a> {
    oracle: &'a dyn OwnershipOracle,
    key: Option<&'a Bytes>,
    primary: Option<bool>,
}

impl Ownership<'_> {
    fn is_primary(&mut self) -> bool {
        let (oracle, key) = (self.oracle, self.key);
        *self
            .primary
            .get_or_insert_with(|| key.map(|k| oracle.is_primary_owner(k)).unwrap_or(true))
    }
}

impl Dispatcher {
    pub(crate) fn new(
        local_member: MemberId,
        ownership: Arc<dyn OwnershipOracle>,
        max_batch_size: usize,
    ) -> Self {
        Self {
            registry: ListenerRegistry::new(),
            local_member,
            ownership,
            max_batch_size,
        }
    }

    pub(crate) fn local_member(&self) -> MemberId {
        self.local_member
    }

    /// Delivers one event phase to every interested registration.
    ///
    /// Every registration is attempted. The first synchronous failure of a
    /// non-clustered listener is returned afterwards.
    pub(crate) fn publish(
        &self,
        rt: &Runtime,
        event: &Event,
    ) -> Result<()> {
        EVENTS_PUBLISHED
            .with_label_values(&[event.event_type().as_str()])
            .inc();

        let registrations = self.registry.interested(event.event_type());
        if registrations.is_empty() {
            return Ok(());
        }

        let mut ownership = Ownership {
            oracle: self.ownership.as_ref(),
            key: event.key(),
            primary: None,
        };
        let mut batches = ClusterBatches::default();
        let mut first_error: Option<DeliveryError> = None;

        for registration in registrations.iter() {
            if registration.cancel.is_cancelled() {
                continue;
            }
            if let Err(e) = self.route(rt, registration, event, &mut ownership, &mut batches) {
                first_error.get_or_insert(e);
            }
        }

        self.ship(rt, batches);

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn route(
        &self,
        rt: &Runtime,
        registration: &Arc<Registration>,
        event: &Event,
        ownership: &mut Ownership<'_>,
        batches: &mut ClusterBatches,
    ) -> std::result::Result<(), DeliveryError> {
        let entry = match event {
            Event::Entry(entry) => entry,
            other => {
                // clustered interest is limited to entry events
                if registration.clustered {
                    return Ok(());
                }
                return self.deliver(rt, registration, other.clone());
            }
        };

        if registration.clustered {
            if entry.is_pre() || !ownership.is_primary() {
                return Ok(());
            }
        } else if registration.primary_owner_only && !ownership.is_primary() {
            return Ok(());
        }

        let Some(prepared) = prepare_entry(registration, entry) else {
            if let Some(state) = registration.transfer.load_full() {
                state.supersede(entry.key());
            }
            return Ok(());
        };

        if registration.origin != self.local_member {
            batches.push(
                registration.origin,
                ClusterEvent {
                    listener_id: registration.id,
                    event: prepared,
                },
            );
            return Ok(());
        }

        let result = self.deliver(rt, registration, Event::Entry(prepared));
        if registration.clustered {
            if let Err(e) = result {
                warn!(listener_id = registration.id, error = %e, "Clustered listener failed");
            }
            return Ok(());
        }
        result
    }

    /// Final delivery step for a local subscriber: captured while an initial
    /// transfer is running, otherwise handed to the listener.
    pub(crate) fn deliver(
        &self,
        rt: &Runtime,
        registration: &Arc<Registration>,
        event: Event,
    ) -> std::result::Result<(), DeliveryError> {
        let event = match registration.transfer.load_full() {
            Some(state) => match state.try_capture(event) {
                Ok(()) => {
                    trace!(listener_id = registration.id, "Live event captured during initial transfer");
                    return Ok(());
                }
                Err(event) => event,
            },
            None => event,
        };
        self.deliver_now(rt, registration, event)
    }

    /// Hands `event` to the listener, bypassing transfer capture
    pub(crate) fn deliver_now(
        &self,
        rt: &Runtime,
        registration: &Arc<Registration>,
        event: Event,
    ) -> std::result::Result<(), DeliveryError> {
        let Some(listener) = &registration.listener else {
            return Ok(());
        };
        if !registration.sync {
            rt.executor.submit(registration.clone(), event);
            return Ok(());
        }

        match invoke_listener(listener, &event) {
            Ok(()) => {
                EVENTS_DELIVERED.with_label_values(&[MODE_SYNC]).inc();
                Ok(())
            }
            Err(source) => {
                DELIVERY_FAILURES.with_label_values(&[MODE_SYNC]).inc();
                Err(DeliveryError {
                    listener_id: registration.id,
                    event_type: event.event_type(),
                    source,
                })
            }
        }
    }

    /// Receiving side of clustered delivery: events raised on other members
    /// for listeners that originated here
    pub(crate) fn notify_cluster_listeners(
        &self,
        rt: &Runtime,
        events: Vec<ClusterEvent>,
    ) {
        for ClusterEvent { listener_id, event } in events {
            let Some(registration) = self.registry.get(listener_id) else {
                debug!(listener_id, "Clustered event for unknown listener ignored");
                continue;
            };
            if registration.listener.is_none()
                || registration.origin != self.local_member
                || !registration.is_interested(event.event_type())
            {
                debug!(listener_id, "Clustered event not addressed to a local subscriber ignored");
                continue;
            }
            if let Err(e) = self.deliver(rt, &registration, Event::Entry(event)) {
                warn!(listener_id, error = %e, "Clustered listener failed");
            }
        }
    }

    fn ship(
        &self,
        rt: &Runtime,
        batches: ClusterBatches,
    ) {
        if batches.is_empty() {
            return;
        }
        let Some(tx) = &rt.cluster_tx else {
            warn!("Clustered events raised without a cluster event manager; dropped");
            return;
        };
        for (audience, batch) in batches.into_batches(self.max_batch_size) {
            if tx.send((audience, batch)).is_err() {
                CLUSTER_SEND_FAILURES.inc();
                warn!(audience, "Cluster event shipper stopped; batch dropped");
            }
        }
    }
}

/// Applies filter and converter. `None` when the filter rejects the event.
fn prepare_entry(
    registration: &Registration,
    entry: &EntryEvent,
) -> Option<EntryEvent> {
    if let Some(filter) = &registration.filter {
        if !filter.accept(entry) {
            return None;
        }
    }
    match &registration.converter {
        Some(converter) => {
            let value = converter.convert(entry);
            Some(entry.clone().with_observed_value(value))
        }
        None => Some(entry.clone()),
    }
}
