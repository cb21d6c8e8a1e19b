use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio_util::sync::CancellationToken;

use super::CacheEventConverter;
use super::CacheEventFilter;
use super::Listener;
use crate::transfer::TransferState;
use crate::EventType;
use crate::MemberId;
use crate::RegistrationError;

/// Cluster-wide listener identifier: origin member in the high 32 bits, a
/// per-member sequence in the low 32 bits.
pub type ListenerId = u64;

pub(crate) fn compose_listener_id(
    origin: MemberId,
    seq: u32,
) -> ListenerId {
    ((origin as u64) << 32) | seq as u64
}

/// Returned by `add_listener`; used to remove the registration later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    id: ListenerId,
}

impl ListenerHandle {
    pub(crate) fn new(id: ListenerId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }
}

/// Forwarding half of a clustered listener that lives on another member
#[derive(Clone)]
pub struct RemoteListenerSpec {
    pub listener_id: ListenerId,
    pub origin: MemberId,
    pub interest: Vec<EventType>,
    pub filter: Option<Arc<dyn CacheEventFilter>>,
    pub converter: Option<Arc<dyn CacheEventConverter>>,
}

impl fmt::Debug for RemoteListenerSpec {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RemoteListenerSpec")
            .field("listener_id", &self.listener_id)
            .field("origin", &self.origin)
            .field("interest", &self.interest)
            .field("has_filter", &self.filter.is_some())
            .field("has_converter", &self.converter.is_some())
            .finish()
    }
}

/// Snapshot of one active registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationInfo {
    pub id: ListenerId,
    pub name: Option<String>,
    pub interest: Vec<EventType>,
    pub origin: MemberId,
    /// False for forwarding halves installed on behalf of another member
    pub local_subscriber: bool,
    pub clustered: bool,
    pub primary_owner_only: bool,
    pub sync: bool,
    pub include_current_state: bool,
    pub transferring: bool,
    pub has_filter: bool,
    pub has_converter: bool,
}

pub(crate) struct Registration {
    pub(crate) id: ListenerId,
    /// `None` for forwarding halves
    pub(crate) listener: Option<Listener>,
    pub(crate) interest: Vec<EventType>,
    pub(crate) filter: Option<Arc<dyn CacheEventFilter>>,
    pub(crate) converter: Option<Arc<dyn CacheEventConverter>>,
    pub(crate) clustered: bool,
    pub(crate) primary_owner_only: bool,
    pub(crate) sync: bool,
    pub(crate) include_current_state: bool,
    pub(crate) origin: MemberId,
    /// Set while an initial transfer is capturing live events
    pub(crate) transfer: ArcSwapOption<TransferState>,
    pub(crate) cancel: CancellationToken,
}

impl Registration {
    /// Validates `listener` and derives the registration.
    ///
    /// `restrict` narrows the declared interest, as `add_filtered_listener` does.
    pub(crate) fn local(
        id: ListenerId,
        origin: MemberId,
        listener: Listener,
        filter: Option<Arc<dyn CacheEventFilter>>,
        converter: Option<Arc<dyn CacheEventConverter>>,
        restrict: Option<&[EventType]>,
    ) -> std::result::Result<Self, RegistrationError> {
        if listener.bindings().is_empty() {
            return Err(RegistrationError::InvalidSubscriber);
        }
        for (event_type, handler) in listener.bindings() {
            if event_type.shape() != handler.shape() {
                return Err(RegistrationError::IncompatibleSubscriber {
                    event_type: *event_type,
                    expected: event_type.shape(),
                    found: handler.shape(),
                });
            }
        }

        let mut interest = listener.interest();
        if let Some(restrict) = restrict {
            interest.retain(|t| restrict.contains(t));
            if interest.is_empty() {
                return Err(RegistrationError::InvalidSubscriber);
            }
        }
        if listener.is_clustered() {
            validate_clustered_interest(&interest)?;
        }

        Ok(Self {
            id,
            clustered: listener.is_clustered(),
            primary_owner_only: listener.is_primary_owner_only(),
            sync: listener.is_sync(),
            include_current_state: listener.includes_current_state(),
            listener: Some(listener),
            interest,
            filter,
            converter,
            origin,
            transfer: ArcSwapOption::empty(),
            cancel: CancellationToken::new(),
        })
    }

    pub(crate) fn forwarding(spec: RemoteListenerSpec) -> std::result::Result<Self, RegistrationError> {
        let mut interest = spec.interest;
        interest.sort();
        interest.dedup();
        if interest.is_empty() {
            return Err(RegistrationError::InvalidSubscriber);
        }
        validate_clustered_interest(&interest)?;

        Ok(Self {
            id: spec.listener_id,
            listener: None,
            interest,
            filter: spec.filter,
            converter: spec.converter,
            clustered: true,
            primary_owner_only: true,
            sync: false,
            include_current_state: false,
            origin: spec.origin,
            transfer: ArcSwapOption::empty(),
            cancel: CancellationToken::new(),
        })
    }

    pub(crate) fn is_interested(
        &self,
        event_type: EventType,
    ) -> bool {
        self.interest.binary_search(&event_type).is_ok()
    }

    pub(crate) fn info(&self) -> RegistrationInfo {
        RegistrationInfo {
            id: self.id,
            name: self.listener.as_ref().and_then(|l| l.name().map(str::to_owned)),
            interest: self.interest.clone(),
            origin: self.origin,
            local_subscriber: self.listener.is_some(),
            clustered: self.clustered,
            primary_owner_only: self.primary_owner_only,
            sync: self.sync,
            include_current_state: self.include_current_state,
            transferring: self.transfer.load().is_some(),
            has_filter: self.filter.is_some(),
            has_converter: self.converter.is_some(),
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("interest", &self.interest)
            .field("clustered", &self.clustered)
            .field("sync", &self.sync)
            .finish_non_exhaustive()
    }
}

fn validate_clustered_interest(interest: &[EventType]) -> std::result::Result<(), RegistrationError> {
    match interest.iter().find(|t| !t.is_cluster_supported()) {
        Some(event_type) => Err(RegistrationError::UnsupportedClusteredEvent {
            event_type: *event_type,
        }),
        None => Ok(()),
    }
}
