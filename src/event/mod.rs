//! Cache event model
//!
//! Immutable descriptions of single lifecycle occurrences raised by the cache.
//! Every mutation produces two [`Event`] instances, one per phase: the pre
//! phase (before the mutation is applied) and the post phase (after).
//!
//! Events come in three payload shapes, see [`EventShape`]:
//!
//! | Shape         | Event types                                                  |
//! |---------------|--------------------------------------------------------------|
//! | `Entry`       | Created, Modified, Removed, Expired, Evicted, Activated,     |
//! |               | Passivated, Loaded, Invalidated                              |
//! | `Transaction` | TxCompleted, TxRegistered                                    |
//! | `Topology`    | TopologyChanged                                              |

mod metadata;
mod types;

pub use metadata::*;
pub use types::*;
