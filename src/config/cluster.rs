use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_NUM_SEGMENTS;
use crate::Error;
use crate::MemberId;
use crate::Result;

/// Identity of this member and the segment layout shared by the cluster
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClusterConfig {
    /// Member id of this node. Must be non-zero.
    #[serde(default = "default_local_member")]
    pub local_member: MemberId,

    /// Number of storage segments. Every member must use the same value.
    #[serde(default = "default_num_segments")]
    pub num_segments: u32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            local_member: default_local_member(),
            num_segments: default_num_segments(),
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.local_member == 0 {
            return Err(Error::Config(ConfigError::Message(
                "cluster.local_member must be non-zero".into(),
            )));
        }
        if self.num_segments == 0 {
            return Err(Error::Config(ConfigError::Message(
                "cluster.num_segments must be greater than 0".into(),
            )));
        }
        Ok(())
    }
}

fn default_local_member() -> MemberId {
    1
}

fn default_num_segments() -> u32 {
    DEFAULT_NUM_SEGMENTS
}
