//! Metric payloads.

use crate::sealed::Sealed;

/// Wire tag of a metric payload.
///
/// Never stored on its own: it is always derived from the active
/// [`MetricValue`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum DataType {
    Float = 1,
    Int32 = 2,
    Bool = 3,
}

/// The typed payload of a metric.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub enum MetricValue {
    #[cfg_attr(feature = "minicbor", n(0))]
    Float(#[cfg_attr(feature = "minicbor", n(0))] f32),

    #[cfg_attr(feature = "minicbor", n(1))]
    Int32(#[cfg_attr(feature = "minicbor", n(0))] i32),

    #[cfg_attr(feature = "minicbor", n(2))]
    Bool(#[cfg_attr(feature = "minicbor", n(0))] bool),
}

impl MetricValue {
    /// The data type matching the active variant.
    pub const fn datatype(&self) -> DataType {
        match self {
            MetricValue::Float(_) => DataType::Float,
            MetricValue::Int32(_) => DataType::Int32,
            MetricValue::Bool(_) => DataType::Bool,
        }
    }
}

impl From<f32> for MetricValue {
    fn from(v: f32) -> Self {
        MetricValue::Float(v)
    }
}

impl From<i32> for MetricValue {
    fn from(v: i32) -> Self {
        MetricValue::Int32(v)
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Bool(v)
    }
}

/// Rust types that can be stored as a [`MetricValue`].
///
/// Implemented for `f32`, `i32` and `bool` only; the set is closed.
pub trait ValueType: Copy + Sealed + Into<MetricValue> {
    /// The data type this Rust type maps to.
    const DATATYPE: DataType;

    /// Borrow the payload if it holds exactly this type.
    fn from_value(value: &MetricValue) -> Option<&Self>;
}

impl ValueType for f32 {
    const DATATYPE: DataType = DataType::Float;

    fn from_value(value: &MetricValue) -> Option<&Self> {
        match value {
            MetricValue::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl ValueType for i32 {
    const DATATYPE: DataType = DataType::Int32;

    fn from_value(value: &MetricValue) -> Option<&Self> {
        match value {
            MetricValue::Int32(v) => Some(v),
            _ => None,
        }
    }
}

impl ValueType for bool {
    const DATATYPE: DataType = DataType::Bool;

    fn from_value(value: &MetricValue) -> Option<&Self> {
        match value {
            MetricValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}
