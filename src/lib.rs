//! Event notification core for a partitioned, distributed in-memory cache.
//!
//! Listeners declare which [`EventType`]s they handle and receive entry,
//! transaction and topology events published by the cache. A listener may ask
//! for the current cache contents on registration; those arrive as synthetic
//! created events merged with concurrent live mutations, without duplicates,
//! gaps or reordering per key.
//!
//! ```ignore
//! let engine = NotifierBuilder::new(NotifierConfig::new()?.validate()?)
//!     .snapshot_scan(store.clone())
//!     .build()?;
//! engine.start()?;
//!
//! let listener = Listener::builder()
//!     .include_current_state(true)
//!     .on_entry([EventType::Created, EventType::Modified], |e| {
//!         tracing::info!(key = ?e.key(), value = ?e.value(), "changed");
//!         Ok(())
//!     })
//!     .build();
//! let handle = engine.add_listener(listener, None, None).await?;
//!
//! engine.publish(EntryEvent::created(key, value, None, false, true))?;
//! engine.remove_listener(&handle);
//! ```

mod cluster;
mod config;
mod constants;
mod errors;
mod event;
mod listener;
mod metrics;
mod notifier;
mod scan;
mod transfer;

pub use cluster::*;
pub use config::*;
pub use errors::*;
pub use event::*;
pub use listener::*;
pub use metrics::*;
pub use notifier::*;
pub use scan::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;

//-----------------------------------------------------------
// Autometrics
/// autometrics: https://docs.autometrics.dev/rust/adding-alerts-and-slos
use autometrics::objectives::Objective;
use autometrics::objectives::ObjectiveLatency;
use autometrics::objectives::ObjectivePercentile;
const API_SLO: Objective = Objective::new("notifier_api")
    .success_rate(ObjectivePercentile::P99_9)
    .latency(ObjectiveLatency::Ms10, ObjectivePercentile::P99);
