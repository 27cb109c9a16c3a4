//! Register-level field bus access.

use std::time::Duration;

use tracing::trace;

use crate::error::TransportError;

/// Reads holding registers from an addressed device, e.g. over Modbus RTU.
pub trait RegisterTransport: Send {
    /// Read `count` consecutive registers starting at `start` from the device
    /// at `address`, waiting at most `timeout` for the answer.
    ///
    /// On success the result holds exactly `count` registers.
    fn read_registers(
        &mut self,
        address: u8,
        start: u16,
        count: u16,
        timeout: Duration,
    ) -> Result<Vec<u16>, TransportError>;
}

impl<T: RegisterTransport + ?Sized> RegisterTransport for Box<T> {
    fn read_registers(
        &mut self,
        address: u8,
        start: u16,
        count: u16,
        timeout: Duration,
    ) -> Result<Vec<u16>, TransportError> {
        (**self).read_registers(address, start, count, timeout)
    }
}

/// Stand-in transport answering every read with `0, 10, 20, ...`.
#[derive(Debug, Default, Clone)]
pub struct DummyTransport {
    reads: u64,
}

impl DummyTransport {
    /// Create a transport that has served no reads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reads served so far.
    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl RegisterTransport for DummyTransport {
    fn read_registers(
        &mut self,
        address: u8,
        start: u16,
        count: u16,
        _timeout: Duration,
    ) -> Result<Vec<u16>, TransportError> {
        self.reads += 1;
        trace!(address, start, count, "dummy register read");
        Ok((0..count).map(|i| i.wrapping_mul(10)).collect())
    }
}
