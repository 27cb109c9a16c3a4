//! # caravan-types
//!
//! The measurement record exchanged between sensor drivers and consumers on a
//! CaravanOS node. A [`Metric`] is a small, self-describing value: who produced
//! it, what physical quantity it carries, a typed payload, when it was taken and
//! an optional set of typed properties (unit, quality, calibration bounds...).
//!
//! ## Design Goals
//!
//! - **Illegal states are unrepresentable**: the payload is a closed sum type, so
//!   the reported [`DataType`] always matches the stored value
//! - **No implicit conversions**: typed accessors return `None` on a type mismatch
//! - **Order-independent equality**: properties live in an ordered map, so two
//!   metrics built with the same properties in any insertion order compare equal
//! - **Embedded friendly**: works with `alloc` only; `std` is a default feature
//!
//! ## Features
//!
//! - `std` (default): Standard library support
//! - `serde`: JSON/MessagePack/etc. serialization via serde
//! - `minicbor`: Compact binary serialization via CBOR
//! - `all`: Enable all serialization formats
//!
//! ## Example
//!
//! ```rust
//! use caravan_types::{Metric, MetricKind, PropertyKey, Quality, Unit};
//!
//! let metric = Metric::builder(42, MetricKind::WaterLevelPercent, 73.5_f32)
//!     .timestamp_ms(123_456)
//!     .sequence(1)
//!     .property(PropertyKey::Unit, Unit::Percent)
//!     .property(PropertyKey::Quality, Quality::Good)
//!     .build();
//!
//! assert_eq!(metric.get_if::<f32>(), Some(73.5));
//! assert_eq!(metric.get_if::<i32>(), None);
//! assert_eq!(metric.unit(), Some(Unit::Percent));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod kind;
mod metric;
mod property;
mod value;

pub use kind::*;
pub use metric::*;
pub use property::*;
pub use value::*;

mod sealed {
    pub trait Sealed {}

    impl Sealed for f32 {}
    impl Sealed for i32 {}
    impl Sealed for bool {}
    impl Sealed for u8 {}
}
