//! # caravan-hal
//!
//! Narrow hardware capabilities used by device drivers. The metric bus never
//! touches these; drivers use them to pace polling, timestamp readings and
//! fetch raw register data.
//!
//! ## Example
//!
//! ```rust
//! use caravan_hal::{Clock, DummyTransport, ManualClock, RegisterTransport};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new(0);
//! clock.advance(250);
//! assert_eq!(clock.now_millis(), 250);
//!
//! let mut transport = DummyTransport::new();
//! let regs = transport.read_registers(1, 0, 3, Duration::from_millis(20)).unwrap();
//! assert_eq!(regs, vec![0, 10, 20]);
//! ```

mod clock;
mod error;
mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::TransportError;
pub use transport::{DummyTransport, RegisterTransport};
