//! Shared helpers for the unit tests
mod common;
mod recorder;
mod scripted_scan;

pub(crate) use common::*;
pub(crate) use recorder::*;
pub(crate) use scripted_scan::*;
