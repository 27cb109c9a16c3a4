//! # caravan-devices
//!
//! Sensor drivers that feed a [`MetricBus`](caravan_bus::MetricBus), and the
//! glue that keeps them polled.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use caravan_devices::NodeSettings;
//! use caravan_hal::{DummyTransport, SystemClock};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # #[cfg(feature = "tokio")]
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = NodeSettings::load(Path::new("node.toml"))?;
//!     let bus = settings.build_bus();
//!
//!     let _log = bus.subscribe(|m| println!("{:?}", m));
//!
//!     let clock = Arc::new(SystemClock::new());
//!     let poller = settings.build_poller(&bus, clock, |_| DummyTransport::new());
//!     let handle = poller.start();
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!     handle.stop();
//!     Ok(())
//! }
//! # #[cfg(not(feature = "tokio"))]
//! # fn main() {}
//! ```
//!
//! ## Features
//!
//! - `tokio` (default): background polling via [`Poller::start`]

mod error;
mod poller;
mod settings;
mod tilt;

pub use error::DeviceError;
#[cfg(feature = "tokio")]
pub use poller::PollHandle;
pub use poller::{Pollable, Poller, PollerBuilder, TickSummary};
pub use settings::{NodeSettings, PollerSettings, TiltSettings, ENV_PREFIX};
pub use tilt::{decode_angle, Wt901cConfig, Wt901cDevice};
