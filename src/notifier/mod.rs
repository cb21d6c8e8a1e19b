//! Event dispatch
//!
//! [`NotificationEngine`] is the entry point: it owns the listener registry,
//! routes published events through the per-registration delivery rules and
//! runs initial state transfers for listeners that ask for current state.
//!
//! Delivery rules per interested registration:
//! - entry events pass the filter, then the converter replaces the observed value
//! - clustered listeners only see post events raised by the key's primary owner;
//!   events for listeners that live on another member are batched per member and
//!   handed to the [`crate::ClusterEventManager`]
//! - `primary_owner_only` local listeners skip keys this member does not own
//! - synchronous listeners run on the publishing thread, the others on striped
//!   worker tasks

mod async_executor;
mod builder;
mod dispatcher;
mod engine;

pub use builder::*;
pub(crate) use dispatcher::*;
pub use engine::*;
