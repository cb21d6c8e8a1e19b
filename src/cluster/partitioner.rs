use bytes::Bytes;

use super::KeyPartitioner;
use super::SegmentId;

/// Maps keys onto a fixed number of segments by the CRC-32 of the key bytes.
///
/// CRC-32 is a fixed algorithm, so members built with different toolchains
/// agree on the segment of a key.
#[derive(Debug, Clone)]
pub struct HashKeyPartitioner {
    num_segments: u32,
}

impl HashKeyPartitioner {
    pub fn new(num_segments: u32) -> Self {
        Self {
            num_segments: num_segments.max(1),
        }
    }
}

impl KeyPartitioner for HashKeyPartitioner {
    fn segment_of(
        &self,
        key: &Bytes,
    ) -> SegmentId {
        crc32fast::hash(key) % self.num_segments
    }

    fn num_segments(&self) -> u32 {
        self.num_segments
    }
}
