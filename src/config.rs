//! Runtime configuration for a local mesh.
//!
//! All values have sensible defaults. Override via environment variables
//! (prefixed `TOPOCOLL_`) or by constructing a custom `CollConfig`.

use crate::error::{CollError, Result};
use crate::topology::TopologyKind;
use std::time::Duration;

/// Parameters fixed when a mesh is built and shared by every rank.
#[derive(Debug, Clone, PartialEq)]
pub struct CollConfig {
    /// Link structure of the mesh. Identical on every rank.
    pub topology: TopologyKind,

    /// Timeout for each receive inside a collective or route.
    pub collective_timeout: Duration,

    /// Timeout for each receive inside the closing barrier.
    pub barrier_timeout: Duration,

    /// Frames buffered per directed link before senders wait.
    pub link_capacity: usize,
}

impl Default for CollConfig {
    fn default() -> Self {
        Self {
            topology: TopologyKind::Complete,
            collective_timeout: Duration::from_secs(30),
            barrier_timeout: Duration::from_secs(30),
            link_capacity: 256,
        }
    }
}

impl CollConfig {
    /// Default config over the given topology.
    pub fn with_topology(topology: TopologyKind) -> Self {
        Self {
            topology,
            ..Self::default()
        }
    }

    /// Load config from environment variables, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `TOPOCOLL_TOPOLOGY`
    /// - `TOPOCOLL_COLLECTIVE_TIMEOUT_SECS`
    /// - `TOPOCOLL_BARRIER_TIMEOUT_SECS`
    /// - `TOPOCOLL_LINK_CAPACITY`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("TOPOCOLL_TOPOLOGY") {
            match v.parse::<TopologyKind>() {
                Ok(kind) => cfg.topology = kind,
                Err(e) => tracing::warn!("ignoring TOPOCOLL_TOPOLOGY: {e}"),
            }
        }
        if let Ok(v) = std::env::var("TOPOCOLL_COLLECTIVE_TIMEOUT_SECS") {
            if let Ok(s) = v.parse::<u64>() {
                cfg.collective_timeout = Duration::from_secs(s);
            }
        }
        if let Ok(v) = std::env::var("TOPOCOLL_BARRIER_TIMEOUT_SECS") {
            if let Ok(s) = v.parse::<u64>() {
                cfg.barrier_timeout = Duration::from_secs(s);
            }
        }
        if let Ok(v) = std::env::var("TOPOCOLL_LINK_CAPACITY") {
            if let Ok(n) = v.parse::<usize>() {
                cfg.link_capacity = n;
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<()> {
        if self.link_capacity == 0 {
            return Err(CollError::InvalidConfig(
                "link_capacity must be at least 1".into(),
            ));
        }
        if self.collective_timeout.is_zero() || self.barrier_timeout.is_zero() {
            return Err(CollError::InvalidConfig("timeouts must be non-zero".into()));
        }
        Ok(())
    }
}
