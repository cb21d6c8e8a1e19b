use std::sync::Arc;

use bytes::Bytes;

use crate::KeyPartitioner;
use crate::NotifierConfig;
use crate::SegmentId;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub(crate) fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

/// Places a key by its last byte, so "key-3" lands in segment 3 % n
#[derive(Debug)]
pub(crate) struct SuffixPartitioner {
    num_segments: u32,
}

impl SuffixPartitioner {
    pub(crate) fn new(num_segments: u32) -> Arc<Self> {
        Arc::new(Self { num_segments })
    }
}

impl KeyPartitioner for SuffixPartitioner {
    fn segment_of(
        &self,
        key: &Bytes,
    ) -> SegmentId {
        key.last().map(|b| *b as u32 % self.num_segments).unwrap_or(0)
    }

    fn num_segments(&self) -> u32 {
        self.num_segments
    }
}

pub(crate) fn test_config(local_member: u32) -> NotifierConfig {
    let mut config = NotifierConfig::default();
    config.cluster.local_member = local_member;
    config.cluster.num_segments = 4;
    config.notification.async_workers = 2;
    config.transfer.yield_every_n_entries = 3;
    config
}

pub(crate) fn key(i: usize) -> Bytes {
    Bytes::from(format!("key-{i}"))
}

pub(crate) fn value(i: usize) -> Bytes {
    Bytes::from(format!("value-{i}"))
}
