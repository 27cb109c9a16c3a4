//! Capability-gated producer base.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

use caravan_types::{InstanceId, Metric};

use crate::bus::MetricBus;
use crate::policy::{is_allowed, DeviceClass, DeviceClassTag, Kind, Permits};

/// Common state of a device of class `C`.
///
/// Concrete devices embed a `DeviceBase` and emit every metric through
/// [`DeviceBase::publish_checked`], which only compiles for kinds the class
/// is permitted to emit.
pub struct DeviceBase<C: DeviceClass> {
    bus: MetricBus,
    instance_id: InstanceId,
    sequence: AtomicU32,
    _class: PhantomData<fn() -> C>,
}

impl<C: DeviceClass> DeviceBase<C> {
    /// Bind a device identity to a bus.
    pub fn new(bus: &MetricBus, instance_id: InstanceId) -> Self {
        Self {
            bus: bus.clone(),
            instance_id,
            sequence: AtomicU32::new(0),
            _class: PhantomData,
        }
    }

    /// Instance id stamped on this device's metrics.
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// The bus this device publishes to.
    pub fn bus(&self) -> &MetricBus {
        &self.bus
    }

    /// Runtime tag of the device class `C`.
    pub fn device_class(&self) -> DeviceClassTag {
        C::TAG
    }

    /// Next per-device sequence number, starting at 1.
    ///
    /// Wraps around after `u32::MAX`.
    pub fn next_sequence(&self) -> u32 {
        self.sequence
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1)
    }

    /// Publish a metric of kind `K` on the bus.
    ///
    /// Only compiles if the device class permits `K`. Returns the number of
    /// subscribers reached.
    ///
    /// ```compile_fail
    /// use caravan_bus::{DeviceBase, MetricBus, Metric, MetricKind};
    /// use caravan_bus::policy::{kinds, WaterTank};
    ///
    /// let bus = MetricBus::new();
    /// let tank = DeviceBase::<WaterTank>::new(&bus, 1);
    /// let metric = Metric::builder(1, MetricKind::GasLevelPercent, 50.0_f32).build();
    /// tank.publish_checked::<kinds::GasLevelPercent>(metric);
    /// ```
    ///
    /// # Panics
    ///
    /// If `metric.kind()` is not `K::KIND`. That is a defect in the device,
    /// not bad input.
    pub fn publish_checked<K: Kind>(&self, metric: Metric) -> usize
    where
        C: Permits<K>,
    {
        assert!(
            metric.kind() == K::KIND,
            "{} device {} tagged a {} metric while publishing {}",
            C::TAG,
            self.instance_id,
            metric.kind(),
            K::KIND,
        );
        debug_assert!(is_allowed(C::TAG, K::KIND));

        self.bus.publish(&metric)
    }
}

impl<C: DeviceClass> fmt::Debug for DeviceBase<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBase")
            .field("class", &C::TAG)
            .field("instance_id", &self.instance_id)
            .finish()
    }
}
