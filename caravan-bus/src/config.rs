//! Bus tuning knobs.

use serde::{Deserialize, Serialize};

/// Configuration for a [`MetricBus`](crate::MetricBus).
///
/// Every field has a default, so partial configuration files are fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Cancelled subscriber records are dropped once the table holds more
    /// entries than this.
    pub compact_threshold: usize,

    /// Maximum nesting of `publish` calls on one thread. A publish made from a
    /// callback counts one level deeper than the publish that invoked it.
    pub max_publish_depth: usize,
}

impl BusConfig {
    pub const DEFAULT_COMPACT_THRESHOLD: usize = 64;
    pub const DEFAULT_MAX_PUBLISH_DEPTH: usize = 16;
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            compact_threshold: Self::DEFAULT_COMPACT_THRESHOLD,
            max_publish_depth: Self::DEFAULT_MAX_PUBLISH_DEPTH,
        }
    }
}
