//! Notification Core Error Hierarchy
//!
//! Defines the error types raised by listener registration, event delivery,
//! initial state transfer and the clustered event boundary.

use config::ConfigError;

use crate::EventShape;
use crate::EventType;
use crate::ListenerId;
use crate::MemberId;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by subscriber callbacks, filters and collaborators
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Subscriber validation failures raised by `add_listener`
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// A synchronous subscriber callback failed
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// Initial state transfer failures
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Clustered event boundary failures
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Engine used outside of its running window
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// An event constructor was given a type it cannot produce
    #[error("{event_type:?} is not an entry lifecycle event")]
    UnexpectedEventType { event_type: EventType },

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// The subscriber declared no usable event interest
    #[error("Listener declares no handler for any recognized event type")]
    InvalidSubscriber,

    /// The subscriber declared an event type its handler cannot represent
    #[error("Handler for {event_type:?} accepts {found:?} events but the event type produces {expected:?} events")]
    IncompatibleSubscriber {
        event_type: EventType,
        expected: EventShape,
        found: EventShape,
    },

    /// Clustered listeners only observe created/modified/removed/expired events
    #[error("Clustered listeners cannot observe {event_type:?} events")]
    UnsupportedClusteredEvent { event_type: EventType },

    /// The same subscriber is already registered
    #[error("Listener already registered as {listener_id}")]
    AlreadyRegistered { listener_id: ListenerId },
}

#[derive(Debug, thiserror::Error)]
#[error("Listener {listener_id} failed to handle {event_type:?} event")]
pub struct DeliveryError {
    pub listener_id: ListenerId,
    pub event_type: EventType,
    #[source]
    pub source: BoxError,
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Registration was removed while its initial state was being transferred
    #[error("Initial state transfer for listener {listener_id} aborted")]
    Aborted { listener_id: ListenerId },

    /// The segment snapshot scan reported a failure
    #[error("Segment snapshot scan failed for listener {listener_id}")]
    ScanFailed {
        listener_id: ListenerId,
        #[source]
        source: BoxError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// The transport could not ship a batch of clustered events
    #[error("Failed to send {events} clustered events to member {audience}: {reason}")]
    SendFailure {
        audience: MemberId,
        events: usize,
        reason: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Notification engine is not running")]
    NotRunning,

    #[error("Notification engine requires a tokio runtime: {0}")]
    NoRuntime(String),
}

impl Error {
    /// True when the error originated in a subscriber callback
    pub fn is_delivery(&self) -> bool {
        matches!(self, Error::Delivery(_))
    }
}
