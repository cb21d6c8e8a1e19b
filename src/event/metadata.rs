use std::time::Duration;

/// Expiration and versioning attributes attached to a cache entry.
///
/// `None` lifespan or max idle means the entry is immortal in that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub lifespan: Option<Duration>,
    pub max_idle: Option<Duration>,
    pub version: Option<u64>,
}

impl Metadata {
    pub fn immortal() -> Self {
        Self::default()
    }

    pub fn with_lifespan(
        mut self,
        lifespan: Duration,
    ) -> Self {
        self.lifespan = Some(lifespan);
        self
    }

    pub fn with_max_idle(
        mut self,
        max_idle: Duration,
    ) -> Self {
        self.max_idle = Some(max_idle);
        self
    }

    pub fn with_version(
        mut self,
        version: u64,
    ) -> Self {
        self.version = Some(version);
        self
    }

    pub fn is_immortal(&self) -> bool {
        self.lifespan.is_none() && self.max_idle.is_none()
    }
}
