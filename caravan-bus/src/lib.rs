//! # caravan-bus
//!
//! In-process distribution of [`Metric`] values from sensor drivers to
//! interested consumers, plus the static capability policy that decides which
//! metric kinds each device class may emit.
//!
//! ## Quick Start
//!
//! ```rust
//! use caravan_bus::{DeviceBase, MetricBus, Metric, MetricKind};
//! use caravan_bus::policy::{kinds, TiltUnit};
//! use std::sync::{Arc, Mutex};
//!
//! let bus = MetricBus::new();
//!
//! // Subscribe: the callback runs for every metric published afterwards
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let subscription = bus.subscribe(move |m: &Metric| sink.lock().unwrap().push(m.kind()));
//!
//! // Devices publish through a capability-checked base
//! let tilt = DeviceBase::<TiltUnit>::new(&bus, 0x1201);
//! let metric = Metric::builder(tilt.instance_id(), MetricKind::TiltAngle, 12.5_f32)
//!     .timestamp_ms(1500)
//!     .sequence(tilt.next_sequence())
//!     .build();
//! tilt.publish_checked::<kinds::TiltAngle>(metric);
//!
//! assert_eq!(*seen.lock().unwrap(), vec![MetricKind::TiltAngle]);
//!
//! // Dropping the subscription cancels it
//! drop(subscription);
//! assert_eq!(bus.subscriber_count(), 0);
//! ```
//!
//! ## Guarantees
//!
//! - **Snapshot-then-deliver**: the recipient list of a publish is fixed under
//!   the bus lock before any callback runs; callbacks run without the lock held
//!   and may call back into the bus
//! - **Registration order**: a single publish reaches subscribers in the order
//!   they subscribed, exactly once each
//! - **Scoped cancellation**: [`Subscription`] cancels exactly once, on explicit
//!   `unsubscribe()` or on drop
//! - **Bounded reentrancy**: nested publishes from callbacks are limited by
//!   [`BusConfig::max_publish_depth`]
//! - **Closed capability policy**: a device can only publish kinds allowed for
//!   its class; anything else fails to compile

mod bus;
mod config;
mod device;
mod error;
pub mod policy;
mod state;
mod subscription;

pub use bus::{Callback, MetricBus, MetricBusBuilder};
pub use config::BusConfig;
pub use device::DeviceBase;
pub use error::BusError;
pub use policy::{is_allowed, DeviceClass, DeviceClassTag, Kind, Permits};
pub use subscription::{SubscriberId, Subscription};

// Re-export types for convenience
pub use caravan_types::{
    DataType, InstanceId, Metric, MetricKind, MetricValue, Properties, PropertyKey,
    PropertyValue, Quality, Unit,
};
