use bytes::Bytes;

use super::Metadata;
use crate::Error;
use crate::MemberId;
use crate::Result;

/// Lifecycle occurrence a listener can declare interest in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    Created,
    Modified,
    Removed,
    Expired,
    Evicted,
    Activated,
    Passivated,
    Loaded,
    Invalidated,
    TxCompleted,
    TxRegistered,
    TopologyChanged,
}

/// Payload shape produced by an [`EventType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventShape {
    Entry,
    Transaction,
    Topology,
}

impl EventType {
    pub const ALL: [EventType; 12] = [
        EventType::Created,
        EventType::Modified,
        EventType::Removed,
        EventType::Expired,
        EventType::Evicted,
        EventType::Activated,
        EventType::Passivated,
        EventType::Loaded,
        EventType::Invalidated,
        EventType::TxCompleted,
        EventType::TxRegistered,
        EventType::TopologyChanged,
    ];

    /// Dense slot index, used by the registry's per-type index
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub fn shape(self) -> EventShape {
        match self {
            EventType::TxCompleted | EventType::TxRegistered => EventShape::Transaction,
            EventType::TopologyChanged => EventShape::Topology,
            _ => EventShape::Entry,
        }
    }

    /// Stable lowercase name, used as a metric label
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Created => "created",
            EventType::Modified => "modified",
            EventType::Removed => "removed",
            EventType::Expired => "expired",
            EventType::Evicted => "evicted",
            EventType::Activated => "activated",
            EventType::Passivated => "passivated",
            EventType::Loaded => "loaded",
            EventType::Invalidated => "invalidated",
            EventType::TxCompleted => "tx_completed",
            EventType::TxRegistered => "tx_registered",
            EventType::TopologyChanged => "topology_changed",
        }
    }

    /// Event types a clustered listener may observe
    pub fn is_cluster_supported(self) -> bool {
        matches!(
            self,
            EventType::Created | EventType::Modified | EventType::Removed | EventType::Expired
        )
    }
}

/// A single entry lifecycle occurrence.
///
/// Pre events never carry the state produced by the operation: `new_value` and
/// `new_metadata` are always `None` when `pre` is true. Post events expose the
/// resulting state through [`EntryEvent::value`]; `old_value` on a post event is
/// only the previous value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryEvent {
    event_type: EventType,
    key: Bytes,
    old_value: Option<Bytes>,
    new_value: Option<Bytes>,
    old_metadata: Option<Metadata>,
    new_metadata: Option<Metadata>,
    pre: bool,
    origin_local: bool,
}

impl EntryEvent {
    pub fn created(
        key: Bytes,
        value: Bytes,
        metadata: Option<Metadata>,
        pre: bool,
        origin_local: bool,
    ) -> Self {
        let (new_value, new_metadata) = if pre { (None, None) } else { (Some(value), metadata) };
        Self {
            event_type: EventType::Created,
            key,
            old_value: None,
            new_value,
            old_metadata: None,
            new_metadata,
            pre,
            origin_local,
        }
    }

    pub fn modified(
        key: Bytes,
        old_value: Option<Bytes>,
        new_value: Bytes,
        old_metadata: Option<Metadata>,
        new_metadata: Option<Metadata>,
        pre: bool,
        origin_local: bool,
    ) -> Self {
        let (new_value, new_metadata) = if pre {
            (None, None)
        } else {
            (Some(new_value), new_metadata)
        };
        Self {
            event_type: EventType::Modified,
            key,
            old_value,
            new_value,
            old_metadata,
            new_metadata,
            pre,
            origin_local,
        }
    }

    pub fn removed(
        key: Bytes,
        old_value: Option<Bytes>,
        old_metadata: Option<Metadata>,
        pre: bool,
        origin_local: bool,
    ) -> Self {
        Self {
            event_type: EventType::Removed,
            key,
            old_value,
            new_value: None,
            old_metadata,
            new_metadata: None,
            pre,
            origin_local,
        }
    }

    /// Expiration is only ever observed after the fact, so there is no pre phase
    pub fn expired(
        key: Bytes,
        old_value: Option<Bytes>,
        old_metadata: Option<Metadata>,
        origin_local: bool,
    ) -> Self {
        Self {
            event_type: EventType::Expired,
            key,
            old_value,
            new_value: None,
            old_metadata,
            new_metadata: None,
            pre: false,
            origin_local,
        }
    }

    /// Evicted, activated, passivated, loaded and invalidated events.
    ///
    /// `value` is the entry value observed in the given phase.
    ///
    /// # Errors
    /// [`Error::UnexpectedEventType`] for any other event type.
    pub fn lifecycle(
        event_type: EventType,
        key: Bytes,
        value: Option<Bytes>,
        metadata: Option<Metadata>,
        pre: bool,
        origin_local: bool,
    ) -> Result<Self> {
        if !matches!(
            event_type,
            EventType::Evicted
                | EventType::Activated
                | EventType::Passivated
                | EventType::Loaded
                | EventType::Invalidated
        ) {
            return Err(Error::UnexpectedEventType { event_type });
        }
        let (old_value, old_metadata, new_value, new_metadata) = if pre {
            (value, metadata, None, None)
        } else {
            (None, None, value, metadata)
        };
        Ok(Self {
            event_type,
            key,
            old_value,
            new_value,
            old_metadata,
            new_metadata,
            pre,
            origin_local,
        })
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn old_value(&self) -> Option<&Bytes> {
        self.old_value.as_ref()
    }

    pub fn new_value(&self) -> Option<&Bytes> {
        self.new_value.as_ref()
    }

    pub fn old_metadata(&self) -> Option<&Metadata> {
        self.old_metadata.as_ref()
    }

    pub fn new_metadata(&self) -> Option<&Metadata> {
        self.new_metadata.as_ref()
    }

    pub fn is_pre(&self) -> bool {
        self.pre
    }

    pub fn is_origin_local(&self) -> bool {
        self.origin_local
    }

    /// Value observed in this phase: the previous value before the
    /// operation, the resulting value after it.
    pub fn value(&self) -> Option<&Bytes> {
        if self.pre {
            self.old_value.as_ref()
        } else {
            self.new_value.as_ref()
        }
    }

    /// Metadata observed in this phase, same rules as [`EntryEvent::value`]
    pub fn metadata(&self) -> Option<&Metadata> {
        if self.pre {
            self.old_metadata.as_ref()
        } else {
            self.new_metadata.as_ref()
        }
    }

    /// Replace the observed value with a converter's projection
    pub(crate) fn with_observed_value(
        mut self,
        value: Option<Bytes>,
    ) -> Self {
        if self.pre {
            self.old_value = value;
        } else {
            self.new_value = value;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEvent {
    pub event_type: EventType,
    pub transaction_id: u64,
    pub successful: bool,
    pub pre: bool,
    pub origin_local: bool,
}

impl TransactionEvent {
    pub fn completed(
        transaction_id: u64,
        successful: bool,
        origin_local: bool,
    ) -> Self {
        Self {
            event_type: EventType::TxCompleted,
            transaction_id,
            successful,
            pre: false,
            origin_local,
        }
    }

    pub fn registered(
        transaction_id: u64,
        origin_local: bool,
    ) -> Self {
        Self {
            event_type: EventType::TxRegistered,
            transaction_id,
            successful: true,
            pre: false,
            origin_local,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyEvent {
    pub topology_id: u64,
    pub previous_members: Vec<MemberId>,
    pub current_members: Vec<MemberId>,
    pub pre: bool,
}

/// Any event the notifier can publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Entry(EntryEvent),
    Transaction(TransactionEvent),
    Topology(TopologyEvent),
}

impl Event {
    pub fn event_type(&self) -> EventType {
        match self {
            Event::Entry(e) => e.event_type,
            Event::Transaction(e) => e.event_type,
            Event::Topology(_) => EventType::TopologyChanged,
        }
    }

    pub fn shape(&self) -> EventShape {
        match self {
            Event::Entry(_) => EventShape::Entry,
            Event::Transaction(_) => EventShape::Transaction,
            Event::Topology(_) => EventShape::Topology,
        }
    }

    pub fn is_pre(&self) -> bool {
        match self {
            Event::Entry(e) => e.pre,
            Event::Transaction(e) => e.pre,
            Event::Topology(e) => e.pre,
        }
    }

    pub fn key(&self) -> Option<&Bytes> {
        match self {
            Event::Entry(e) => Some(&e.key),
            _ => None,
        }
    }

    pub fn as_entry(&self) -> Option<&EntryEvent> {
        match self {
            Event::Entry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EntryEvent> for Event {
    fn from(e: EntryEvent) -> Self {
        Event::Entry(e)
    }
}

impl From<TransactionEvent> for Event {
    fn from(e: TransactionEvent) -> Self {
        Event::Transaction(e)
    }
}

impl From<TopologyEvent> for Event {
    fn from(e: TopologyEvent) -> Self {
        Event::Topology(e)
    }
}
