use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use autometrics::autometrics;
use tokio::runtime::Handle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::Dispatcher;
use super::Runtime;
use crate::cluster::ClusterEvent;
use crate::cluster::ClusterEventManager;
use crate::cluster::KeyPartitioner;
use crate::listener::compose_listener_id;
use crate::listener::Registration;
use crate::metrics::register_custom_metrics;
use crate::metrics::ACTIVE_LISTENERS;
use crate::scan::SegmentSnapshotScan;
use crate::transfer::TransferCoordinator;
use crate::transfer::TransferState;
use crate::CacheEventConverter;
use crate::CacheEventFilter;
use crate::Error;
use crate::Event;
use crate::EventType;
use crate::LifecycleError;
use crate::Listener;
use crate::ListenerHandle;
use crate::MemberId;
use crate::NotifierConfig;
use crate::RegistrationInfo;
use crate::RemoteListenerSpec;
use crate::Result;
use crate::TransferError;
use crate::API_SLO;

/// Listener registry and event dispatch for one cache.
///
/// Share it behind an `Arc`. Nothing is delivered before [`Self::start`] or
/// after [`Self::stop`].
pub struct NotificationEngine {
    config: NotifierConfig,
    dispatcher: Dispatcher,
    partitioner: Arc<dyn KeyPartitioner>,
    scan: Arc<dyn SegmentSnapshotScan>,
    cluster_events: Option<Arc<dyn ClusterEventManager>>,
    runtime: ArcSwapOption<Runtime>,
    next_seq: AtomicU32,
}

impl std::fmt::Debug for NotificationEngine {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("NotificationEngine")
            .field("local_member", &self.dispatcher.local_member())
            .field("listeners", &self.dispatcher.registry.len())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl NotificationEngine {
    pub(crate) fn new(
        config: NotifierConfig,
        dispatcher: Dispatcher,
        partitioner: Arc<dyn KeyPartitioner>,
        scan: Arc<dyn SegmentSnapshotScan>,
        cluster_events: Option<Arc<dyn ClusterEventManager>>,
    ) -> Self {
        Self {
            config,
            dispatcher,
            partitioner,
            scan,
            cluster_events,
            runtime: ArcSwapOption::empty(),
            next_seq: AtomicU32::new(1),
        }
    }

    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    pub fn local_member(&self) -> MemberId {
        self.dispatcher.local_member()
    }

    pub fn is_running(&self) -> bool {
        self.runtime.load().is_some()
    }

    /// Starts the async workers and the clustered event shipper on the
    /// current tokio runtime. Calling it on a running engine is a no-op.
    ///
    /// # Errors
    /// [`LifecycleError::NoRuntime`] outside of a tokio runtime.
    pub fn start(&self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        let handle = Handle::try_current().map_err(|e| LifecycleError::NoRuntime(e.to_string()))?;
        register_custom_metrics();

        let runtime = Runtime::start(
            handle,
            self.config.notification.async_workers,
            self.config.notification.async_queue_warn_threshold,
            self.cluster_events.clone(),
        );
        self.runtime.store(Some(Arc::new(runtime)));
        info!(local_member = self.local_member(), "Notification engine started");
        Ok(())
    }

    /// Removes every registration and cancels in-flight transfers.
    ///
    /// Events already queued for async listeners may still be delivered.
    pub fn stop(&self) {
        if self.runtime.swap(None).is_none() {
            return;
        }
        let removed = self.dispatcher.registry.clear();
        for registration in &removed {
            registration.cancel.cancel();
        }
        ACTIVE_LISTENERS.set(0);
        info!(removed = removed.len(), "Notification engine stopped");
    }

    fn running(&self) -> Result<Arc<Runtime>> {
        self.runtime.load_full().ok_or_else(|| LifecycleError::NotRunning.into())
    }

    /// Registers `listener`.
    ///
    /// When the listener includes current state, the call returns after every
    /// entry present at registration was delivered as a synthetic created
    /// event, merged with the live events raised meanwhile.
    ///
    /// # Errors
    /// - [`crate::RegistrationError`] when the listener is rejected; nothing is registered
    /// - [`TransferError::ScanFailed`] or a [`crate::DeliveryError`] when the initial
    ///   transfer fails; the registration is removed again
    #[autometrics(objective = API_SLO)]
    pub async fn add_listener(
        &self,
        listener: Listener,
        filter: Option<Arc<dyn CacheEventFilter>>,
        converter: Option<Arc<dyn CacheEventConverter>>,
    ) -> Result<ListenerHandle> {
        self.register(listener, filter, converter, None).await
    }

    /// Like [`Self::add_listener`], narrowing the listener's interest to `types`
    #[autometrics(objective = API_SLO)]
    pub async fn add_filtered_listener(
        &self,
        listener: Listener,
        filter: Option<Arc<dyn CacheEventFilter>>,
        converter: Option<Arc<dyn CacheEventConverter>>,
        types: &[EventType],
    ) -> Result<ListenerHandle> {
        self.register(listener, filter, converter, Some(types)).await
    }

    async fn register(
        &self,
        listener: Listener,
        filter: Option<Arc<dyn CacheEventFilter>>,
        converter: Option<Arc<dyn CacheEventConverter>>,
        restrict: Option<&[EventType]>,
    ) -> Result<ListenerHandle> {
        let rt = self.running()?;
        let id = compose_listener_id(self.local_member(), self.next_seq.fetch_add(1, Ordering::Relaxed));
        let registration = Registration::local(id, self.local_member(), listener, filter, converter, restrict)?;

        let transfer = if registration.include_current_state && registration.is_interested(EventType::Created) {
            let state = Arc::new(TransferState::new(
                id,
                self.partitioner.clone(),
                self.config.transfer.segment_queue_warn_threshold,
            ));
            registration.transfer.store(Some(state.clone()));
            Some(state)
        } else {
            if registration.include_current_state {
                debug!(listener_id = id, "Listener includes current state but not created events; no transfer");
            }
            None
        };

        let registration = Arc::new(registration);
        self.dispatcher.registry.insert(registration.clone())?;
        ACTIVE_LISTENERS.set(self.dispatcher.registry.len() as i64);
        info!(
            listener_id = id,
            interest = ?registration.interest,
            clustered = registration.clustered,
            sync = registration.sync,
            "Listener registered"
        );

        if let Some(state) = transfer {
            let coordinator = TransferCoordinator::new(&self.dispatcher, &rt, self.scan.as_ref(), &self.config.transfer);
            let result = coordinator.run(&registration, &state).await;
            registration.transfer.store(None);
            match result {
                Ok(()) => {}
                Err(Error::Transfer(TransferError::Aborted { listener_id })) => {
                    debug!(listener_id, "Initial state transfer aborted by removal");
                }
                Err(e) => {
                    warn!(listener_id = id, error = %e, "Initial state transfer failed; listener removed");
                    self.unregister(id);
                    return Err(e);
                }
            }
        }

        Ok(ListenerHandle::new(id))
    }

    /// Installs the forwarding half of a clustered listener that lives on
    /// another member. Events for keys this member owns are shipped to the
    /// listener's origin.
    #[autometrics(objective = API_SLO)]
    pub fn install_remote_cluster_listener(
        &self,
        spec: RemoteListenerSpec,
    ) -> Result<ListenerHandle> {
        self.running()?;
        let registration = Arc::new(Registration::forwarding(spec)?);
        let id = registration.id;
        self.dispatcher.registry.insert(registration.clone())?;
        ACTIVE_LISTENERS.set(self.dispatcher.registry.len() as i64);
        info!(listener_id = id, origin = registration.origin, "Remote cluster listener installed");
        Ok(ListenerHandle::new(id))
    }

    /// Removes the registration. Returns false when it was already gone.
    #[autometrics(objective = API_SLO)]
    pub fn remove_listener(
        &self,
        handle: &ListenerHandle,
    ) -> bool {
        self.unregister(handle.id())
    }

    /// Removes the registration of `listener`, if any
    pub fn remove_subscriber(
        &self,
        listener: &Listener,
    ) -> bool {
        match self.dispatcher.registry.find_by_listener(listener) {
            Some(registration) => self.unregister(registration.id),
            None => false,
        }
    }

    fn unregister(
        &self,
        id: u64,
    ) -> bool {
        match self.dispatcher.registry.remove(id) {
            Some(registration) => {
                registration.cancel.cancel();
                ACTIVE_LISTENERS.set(self.dispatcher.registry.len() as i64);
                info!(listener_id = id, "Listener removed");
                true
            }
            None => {
                debug!(listener_id = id, "Listener already removed");
                false
            }
        }
    }

    /// Publishes one phase of a cache operation.
    ///
    /// # Errors
    /// The first [`crate::DeliveryError`] raised by a synchronous local listener,
    /// after every interested listener was attempted.
    #[autometrics(objective = API_SLO)]
    pub fn publish(
        &self,
        event: impl Into<Event>,
    ) -> Result<()> {
        let rt = self.running()?;
        self.dispatcher.publish(&rt, &event.into())
    }

    /// Delivers events raised on other members to the clustered listeners
    /// that originated here. Unknown listener ids are ignored.
    #[autometrics(objective = API_SLO)]
    pub fn notify_cluster_listeners(
        &self,
        events: Vec<ClusterEvent>,
    ) -> Result<()> {
        let rt = self.running()?;
        self.dispatcher.notify_cluster_listeners(&rt, events);
        Ok(())
    }

    pub fn list_active_registrations(&self) -> Vec<RegistrationInfo> {
        self.dispatcher.registry.all().iter().map(|r| r.info()).collect()
    }

    pub fn has_listener(
        &self,
        event_type: EventType,
    ) -> bool {
        self.dispatcher.registry.has_listener(event_type)
    }

    pub fn is_registered(
        &self,
        handle: &ListenerHandle,
    ) -> bool {
        self.dispatcher.registry.contains(handle.id())
    }
}
