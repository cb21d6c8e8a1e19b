//! Subscriber declarations and the registration index.
//!
//! A [`Listener`] names, per [`crate::EventType`], the handler that receives
//! it. Declared interest is validated when the listener is registered, and
//! the registry keeps one lookup slot per event type so dispatch only touches
//! registrations that asked for an event.

mod builder;
mod filter;
mod registration;
mod registry;

pub use builder::*;
pub use filter::*;
pub use registration::*;
pub(crate) use registry::*;
