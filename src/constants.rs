// -
// Segments

/// Default number of storage segments per cache
pub(crate) const DEFAULT_NUM_SEGMENTS: u32 = 256;

// -
// Metric labels

pub(crate) const MODE_SYNC: &str = "sync";
pub(crate) const MODE_ASYNC: &str = "async";
pub(crate) const MODE_CLUSTER: &str = "cluster";
