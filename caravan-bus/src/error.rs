//! Error types for the bus.

use thiserror::Error;

/// Errors returned by [`MetricBus::try_publish`](crate::MetricBus::try_publish).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// A callback re-entered `publish` deeper than the configured limit.
    ///
    /// The metric was not delivered to anyone.
    #[error("publish nesting depth {depth} exceeds limit {limit}")]
    ReentrancyLimit { depth: usize, limit: usize },
}
