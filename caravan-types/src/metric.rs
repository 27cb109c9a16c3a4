//! The metric record.

use crate::{
    DataType, MetricKind, MetricValue, Properties, PropertyKey, PropertyType, PropertyValue,
    Quality, Unit, ValueType,
};

/// Caller-assigned identity of a producing device instance.
///
/// Must stay stable per physical device for the lifetime of the process.
pub type InstanceId = u32;

/// An immutable, timestamped measurement.
///
/// Identity, kind, payload, timestamp and sequence are fixed at construction.
/// Only properties can be added afterwards (see [`Metric::set_property`]).
///
/// Two metrics are equal iff every field is equal, including the full property
/// map regardless of the order in which properties were inserted.
///
/// # Example
///
/// ```rust
/// use caravan_types::{Metric, MetricKind, DataType};
///
/// let m = Metric::make(7, MetricKind::Health, -2_i32, 99, 4, Default::default());
/// assert_eq!(m.datatype(), DataType::Int32);
/// assert_eq!(m.get_if::<i32>(), Some(-2));
/// assert_eq!(m.get_if::<f32>(), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct Metric {
    #[cfg_attr(feature = "minicbor", n(0))]
    instance_id: InstanceId,

    #[cfg_attr(feature = "minicbor", n(1))]
    kind: MetricKind,

    #[cfg_attr(feature = "minicbor", n(2))]
    value: MetricValue,

    #[cfg_attr(feature = "minicbor", n(3))]
    timestamp_ms: u64,

    #[cfg_attr(feature = "minicbor", n(4))]
    sequence: u32,

    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Properties::is_empty"))]
    #[cfg_attr(feature = "minicbor", n(5))]
    properties: Properties,
}

impl Metric {
    /// Build a metric from all of its fields at once.
    ///
    /// The [`DataType`] is inferred from the payload's variant.
    pub fn make(
        instance_id: InstanceId,
        kind: MetricKind,
        value: impl Into<MetricValue>,
        timestamp_ms: u64,
        sequence: u32,
        properties: Properties,
    ) -> Self {
        Self {
            instance_id,
            kind,
            value: value.into(),
            timestamp_ms,
            sequence,
            properties,
        }
    }

    /// Create a builder; timestamp and sequence default to zero.
    pub fn builder(
        instance_id: InstanceId,
        kind: MetricKind,
        value: impl Into<MetricValue>,
    ) -> MetricBuilder {
        MetricBuilder::new(instance_id, kind, value)
    }

    /// Producer instance id.
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// What the metric measures.
    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// The payload tag, always in agreement with [`Metric::value`].
    pub fn datatype(&self) -> DataType {
        self.value.datatype()
    }

    /// The payload.
    pub fn value(&self) -> MetricValue {
        self.value
    }

    /// Producer timestamp, taken from a monotonic millisecond clock.
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    /// Producer-assigned sequence number.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// The payload, if it is exactly of type `T`.
    pub fn get_if<T: ValueType>(&self) -> Option<T> {
        T::from_value(&self.value).copied()
    }

    /// Borrow the payload, if it is exactly of type `T`.
    pub fn value_ref<T: ValueType>(&self) -> Option<&T> {
        T::from_value(&self.value)
    }

    /// All properties, ordered by key.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Whether `key` is set, whatever its type.
    pub fn has_property(&self, key: PropertyKey) -> bool {
        self.properties.contains_key(&key)
    }

    /// Insert a property, overwriting any value already stored under `key`.
    ///
    /// Returns the previous value.
    pub fn set_property(
        &mut self,
        key: PropertyKey,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.properties.insert(key, value.into())
    }

    /// Typed property lookup. A value of another type yields `None`.
    pub fn get_property<T: PropertyType>(&self, key: PropertyKey) -> Option<T> {
        self.properties.get(&key).and_then(T::from_property)
    }

    /// Decode the [`PropertyKey::Unit`] property.
    pub fn unit(&self) -> Option<Unit> {
        self.get_property::<u8>(PropertyKey::Unit).and_then(Unit::from_u8)
    }

    /// Decode the [`PropertyKey::Quality`] property.
    pub fn quality(&self) -> Option<Quality> {
        self.get_property::<u8>(PropertyKey::Quality)
            .and_then(Quality::from_u8)
    }
}

/// Builder for [`Metric`].
#[derive(Debug, Clone)]
pub struct MetricBuilder {
    instance_id: InstanceId,
    kind: MetricKind,
    value: MetricValue,
    timestamp_ms: u64,
    sequence: u32,
    properties: Properties,
}

impl MetricBuilder {
    /// Start a metric with zero timestamp and sequence and no properties.
    pub fn new(instance_id: InstanceId, kind: MetricKind, value: impl Into<MetricValue>) -> Self {
        Self {
            instance_id,
            kind,
            value: value.into(),
            timestamp_ms: 0,
            sequence: 0,
            properties: Properties::new(),
        }
    }

    /// Set the producer timestamp.
    pub fn timestamp_ms(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    /// Set the sequence number.
    pub fn sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    /// Add a property. A later call with the same key wins.
    pub fn property(mut self, key: PropertyKey, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key, value.into());
        self
    }

    /// Finish the metric.
    pub fn build(self) -> Metric {
        Metric::make(
            self.instance_id,
            self.kind,
            self.value,
            self.timestamp_ms,
            self.sequence,
            self.properties,
        )
    }
}
