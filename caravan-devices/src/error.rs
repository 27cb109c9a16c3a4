//! Error types for device drivers.

use caravan_hal::TransportError;
use thiserror::Error;

/// Errors that can occur while driving a device or loading its settings.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Register read failed.
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    /// Registers were read but do not hold a usable value.
    #[error("failed to decode register data: {0}")]
    Decode(String),

    /// Settings could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
}
