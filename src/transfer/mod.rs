//! Initial state transfer
//!
//! A registration asking for the current cache contents is indexed in
//! capturing mode before the segment scan starts. Live events for segments
//! that are still being scanned are queued per segment; each segment's queue
//! is drained right after its last synthetic created event, so listeners see
//! the snapshot and the live stream merged without gaps or duplicates.

mod coordinator;
mod state;

pub(crate) use coordinator::*;
pub(crate) use state::*;
