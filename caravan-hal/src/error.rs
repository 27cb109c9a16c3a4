//! Error types for hardware access.

use thiserror::Error;

/// Errors that can occur while reading registers from a field device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No answer within the requested timeout.
    #[error("register read timed out")]
    Timeout,

    /// The underlying port failed.
    #[error("transport I/O failed: {0}")]
    Io(String),

    /// The device answered with a protocol exception.
    #[error("device returned exception code {code}")]
    Exception { code: u8 },

    /// Fewer registers came back than were requested.
    #[error("short read: expected {expected} registers, got {actual}")]
    ShortRead { expected: u16, actual: u16 },
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                TransportError::Timeout
            }
            _ => TransportError::Io(err.to_string()),
        }
    }
}
