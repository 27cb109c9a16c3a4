//! Typed metric properties.

use alloc::collections::BTreeMap;

use crate::sealed::Sealed;

/// Property map attached to a metric.
///
/// An ordered map, so equality never depends on insertion order.
pub type Properties = BTreeMap<PropertyKey, PropertyValue>;

/// Closed set of property keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
#[cfg_attr(feature = "minicbor", cbor(index_only))]
#[repr(u8)]
pub enum PropertyKey {
    /// Physical unit, stored as a `u8` [`Unit`] code.
    #[cfg_attr(feature = "minicbor", n(1))]
    Unit = 1,
    /// Measurement quality, stored as a `u8` [`Quality`] code.
    #[cfg_attr(feature = "minicbor", n(2))]
    Quality = 2,
    #[cfg_attr(feature = "minicbor", n(4))]
    Scale = 4,
    #[cfg_attr(feature = "minicbor", n(5))]
    Offset = 5,
    #[cfg_attr(feature = "minicbor", n(6))]
    Min = 6,
    #[cfg_attr(feature = "minicbor", n(7))]
    Max = 7,
    #[cfg_attr(feature = "minicbor", n(8))]
    SensorId = 8,
}

/// The value stored under a [`PropertyKey`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub enum PropertyValue {
    #[cfg_attr(feature = "minicbor", n(0))]
    U8(#[cfg_attr(feature = "minicbor", n(0))] u8),

    #[cfg_attr(feature = "minicbor", n(1))]
    Int32(#[cfg_attr(feature = "minicbor", n(0))] i32),

    #[cfg_attr(feature = "minicbor", n(2))]
    Float(#[cfg_attr(feature = "minicbor", n(0))] f32),
}

impl From<u8> for PropertyValue {
    fn from(v: u8) -> Self {
        PropertyValue::U8(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int32(v)
    }
}

impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<Unit> for PropertyValue {
    fn from(unit: Unit) -> Self {
        PropertyValue::U8(unit as u8)
    }
}

impl From<Quality> for PropertyValue {
    fn from(quality: Quality) -> Self {
        PropertyValue::U8(quality as u8)
    }
}

/// Rust types that can be stored as a [`PropertyValue`].
pub trait PropertyType: Copy + Sealed + Into<PropertyValue> {
    /// Extract the value if it holds exactly this type.
    fn from_property(value: &PropertyValue) -> Option<Self>;
}

impl PropertyType for u8 {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::U8(v) => Some(*v),
            _ => None,
        }
    }
}

impl PropertyType for i32 {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Int32(v) => Some(*v),
            _ => None,
        }
    }
}

impl PropertyType for f32 {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// Physical unit codes carried in the [`PropertyKey::Unit`] property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Unit {
    None = 0,
    Percent = 1,
    Degree = 2,
    Celsius = 3,
    Volt = 4,
    Ampere = 5,
    Watt = 6,
}

impl Unit {
    /// Decode a wire code. Unknown codes give `None`.
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Unit::None),
            1 => Some(Unit::Percent),
            2 => Some(Unit::Degree),
            3 => Some(Unit::Celsius),
            4 => Some(Unit::Volt),
            5 => Some(Unit::Ampere),
            6 => Some(Unit::Watt),
            _ => None,
        }
    }
}

/// Measurement quality codes carried in the [`PropertyKey::Quality`] property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Quality {
    Good = 0,
    Uncertain = 1,
    Bad = 2,
}

impl Quality {
    /// Decode a wire code. Unknown codes give `None`.
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Quality::Good),
            1 => Some(Quality::Uncertain),
            2 => Some(Quality::Bad),
            _ => None,
        }
    }
}
