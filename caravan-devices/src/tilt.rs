//! WT901C inclinometer.

use std::time::Duration;

use caravan_bus::policy::{kinds, TiltUnit};
use caravan_bus::{DeviceBase, MetricBus};
use caravan_hal::{RegisterTransport, TransportError};
use caravan_types::{InstanceId, Metric, MetricKind, PropertyKey, Quality, Unit};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DeviceError;
use crate::poller::Pollable;

/// Register layout and pacing of a WT901C on an RS-485 line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Wt901cConfig {
    /// Slave address on the field bus.
    pub modbus_addr: u8,
    /// First holding register to read.
    pub start_reg: u16,
    /// Number of registers per read.
    pub reg_count: u16,
    /// Minimum time between reads.
    pub poll_interval_ms: u32,
    /// Transport timeout per read.
    pub timeout_ms: u32,
}

impl Default for Wt901cConfig {
    fn default() -> Self {
        Self {
            modbus_addr: 1,
            start_reg: 0,
            reg_count: 4,
            poll_interval_ms: 50,
            timeout_ms: 20,
        }
    }
}

/// WT901C tilt sensor publishing [`MetricKind::TiltAngle`].
///
/// The first register of each read holds the angle as a signed 16-bit value
/// in hundredths of a degree.
///
/// # Example
///
/// ```rust
/// use caravan_bus::{MetricBus, MetricKind};
/// use caravan_devices::{Wt901cConfig, Wt901cDevice};
/// use caravan_hal::DummyTransport;
/// use std::sync::{Arc, Mutex};
///
/// let bus = MetricBus::new();
/// let angles = Arc::new(Mutex::new(Vec::new()));
/// let sink = angles.clone();
/// let _sub = bus.subscribe(move |m| sink.lock().unwrap().push(m.get_if::<f32>()));
///
/// let mut tilt = Wt901cDevice::new(&bus, 0x1201, DummyTransport::new(), Wt901cConfig::default());
/// assert!(tilt.tick(0).unwrap());
/// assert!(!tilt.tick(10).unwrap());
///
/// // The dummy transport answers 0, 10, 20, ...
/// assert_eq!(*angles.lock().unwrap(), vec![Some(0.0)]);
/// ```
pub struct Wt901cDevice<T: RegisterTransport> {
    base: DeviceBase<TiltUnit>,
    transport: T,
    config: Wt901cConfig,
    name: String,
    last_poll_ms: Option<u64>,
}

impl<T: RegisterTransport> Wt901cDevice<T> {
    /// Create a sensor publishing to `bus` over `transport`.
    pub fn new(
        bus: &MetricBus,
        instance_id: InstanceId,
        transport: T,
        config: Wt901cConfig,
    ) -> Self {
        Self {
            base: DeviceBase::new(bus, instance_id),
            transport,
            name: format!("wt901c@{}", config.modbus_addr),
            config,
            last_poll_ms: None,
        }
    }

    /// Instance id stamped on this sensor's metrics.
    pub fn instance_id(&self) -> InstanceId {
        self.base.instance_id()
    }

    /// Register layout and pacing.
    pub fn config(&self) -> &Wt901cConfig {
        &self.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Poll if the configured interval has elapsed since the last poll.
    ///
    /// The first call always polls. Returns `Ok(true)` if a reading was
    /// published, `Ok(false)` if it was not yet time. A failed poll still
    /// counts as a poll for pacing.
    pub fn tick(&mut self, now_ms: u64) -> Result<bool, DeviceError> {
        if let Some(last) = self.last_poll_ms {
            if now_ms.saturating_sub(last) < u64::from(self.config.poll_interval_ms) {
                return Ok(false);
            }
        }
        self.last_poll_ms = Some(now_ms);
        self.read_once_and_publish(now_ms).map(|_| true)
    }

    /// Read the sensor and publish one angle stamped `timestamp_ms`.
    ///
    /// Returns the number of subscribers reached. Nothing is published if
    /// the read or the decode fails.
    pub fn read_once_and_publish(&mut self, timestamp_ms: u64) -> Result<usize, DeviceError> {
        let registers = self.transport.read_registers(
            self.config.modbus_addr,
            self.config.start_reg,
            self.config.reg_count,
            Duration::from_millis(u64::from(self.config.timeout_ms)),
        )?;

        if registers.len() < usize::from(self.config.reg_count) {
            return Err(TransportError::ShortRead {
                expected: self.config.reg_count,
                actual: u16::try_from(registers.len()).unwrap_or(u16::MAX),
            }
            .into());
        }

        let degrees = decode_angle(&registers)?;
        debug!(device = %self.name, degrees, "tilt reading");

        let metric = Metric::builder(self.base.instance_id(), MetricKind::TiltAngle, degrees)
            .timestamp_ms(timestamp_ms)
            .sequence(self.base.next_sequence())
            .property(PropertyKey::Unit, Unit::Degree)
            .property(PropertyKey::Quality, Quality::Good)
            .build();

        Ok(self.base.publish_checked::<kinds::TiltAngle>(metric))
    }
}

impl<T: RegisterTransport> Pollable for Wt901cDevice<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn tick(&mut self, now_ms: u64) -> Result<bool, DeviceError> {
        Wt901cDevice::tick(self, now_ms)
    }
}

/// Angle in degrees from the first register (i16, 0.01 degree steps).
pub fn decode_angle(registers: &[u16]) -> Result<f32, DeviceError> {
    let raw = registers
        .first()
        .ok_or_else(|| DeviceError::Decode("no angle register".to_string()))?;
    Ok(f32::from(*raw as i16) / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Transport answering from a queue of canned results.
    #[derive(Default)]
    struct ScriptedTransport {
        answers: VecDeque<Result<Vec<u16>, TransportError>>,
        requests: Vec<(u8, u16, u16, Duration)>,
    }

    impl ScriptedTransport {
        fn answering(answers: impl IntoIterator<Item = Result<Vec<u16>, TransportError>>) -> Self {
            Self {
                answers: answers.into_iter().collect(),
                requests: Vec::new(),
            }
        }
    }

    impl RegisterTransport for ScriptedTransport {
        fn read_registers(
            &mut self,
            address: u8,
            start: u16,
            count: u16,
            timeout: Duration,
        ) -> Result<Vec<u16>, TransportError> {
            self.requests.push((address, start, count, timeout));
            self.answers.pop_front().unwrap_or(Err(TransportError::Timeout))
        }
    }

    fn two_register_config() -> Wt901cConfig {
        Wt901cConfig {
            reg_count: 2,
            ..Wt901cConfig::default()
        }
    }

    fn capture(bus: &MetricBus) -> (caravan_bus::Subscription, Arc<Mutex<Vec<Metric>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = bus.subscribe(move |m| sink.lock().push(m.clone()));
        (sub, seen)
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    #[test]
    fn decodes_hundredths_of_a_degree() {
        assert_eq!(decode_angle(&[1234, 0]).unwrap(), 12.34);
        assert_eq!(decode_angle(&[0]).unwrap(), 0.0);
    }

    #[test]
    fn decodes_negative_angles() {
        assert_eq!(decode_angle(&[0xFFFF]).unwrap(), -0.01);
        assert_eq!(decode_angle(&[(-9000_i16) as u16]).unwrap(), -90.0);
    }

    #[test]
    fn decode_without_registers_fails() {
        assert!(matches!(decode_angle(&[]), Err(DeviceError::Decode(_))));
    }

    // ========================================================================
    // Publishing
    // ========================================================================

    #[test]
    fn publishes_tilt_angle_with_unit_and_quality() {
        let bus = MetricBus::new();
        let (_sub, seen) = capture(&bus);
        let transport = ScriptedTransport::answering([Ok(vec![1234, 0])]);
        let mut tilt = Wt901cDevice::new(&bus, 0x1201, transport, two_register_config());

        assert_eq!(tilt.read_once_and_publish(1_000).unwrap(), 1);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        let metric = &seen[0];
        assert_eq!(metric.kind(), MetricKind::TiltAngle);
        assert_eq!(metric.instance_id(), 0x1201);
        assert_eq!(metric.timestamp_ms(), 1_000);
        assert_eq!(metric.sequence(), 1);
        assert_eq!(metric.get_if::<f32>(), Some(12.34));
        assert_eq!(metric.unit(), Some(Unit::Degree));
        assert_eq!(metric.quality(), Some(Quality::Good));
    }

    #[test]
    fn read_uses_configured_registers_and_timeout() {
        let bus = MetricBus::new();
        let config = Wt901cConfig {
            modbus_addr: 7,
            start_reg: 0x34,
            reg_count: 3,
            timeout_ms: 40,
            ..Wt901cConfig::default()
        };
        let transport = ScriptedTransport::answering([Ok(vec![100, 0, 0])]);
        let mut tilt = Wt901cDevice::new(&bus, 1, transport, config);

        tilt.read_once_and_publish(0).unwrap();
        assert_eq!(
            tilt.transport().requests,
            vec![(7, 0x34, 3, Duration::from_millis(40))]
        );
    }

    #[test]
    fn transport_failure_publishes_nothing() {
        let bus = MetricBus::new();
        let (_sub, seen) = capture(&bus);
        let transport = ScriptedTransport::answering([Err(TransportError::Exception { code: 2 })]);
        let mut tilt = Wt901cDevice::new(&bus, 1, transport, two_register_config());

        let err = tilt.read_once_and_publish(0).unwrap_err();
        assert!(matches!(
            err,
            DeviceError::Transport(TransportError::Exception { code: 2 })
        ));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn short_read_publishes_nothing() {
        let bus = MetricBus::new();
        let (_sub, seen) = capture(&bus);
        let transport = ScriptedTransport::answering([Ok(vec![1234])]);
        let mut tilt = Wt901cDevice::new(&bus, 1, transport, two_register_config());

        let err = tilt.read_once_and_publish(0).unwrap_err();
        assert!(matches!(
            err,
            DeviceError::Transport(TransportError::ShortRead { expected: 2, actual: 1 })
        ));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn zero_register_config_fails_to_decode() {
        let bus = MetricBus::new();
        let (_sub, seen) = capture(&bus);
        let config = Wt901cConfig {
            reg_count: 0,
            ..Wt901cConfig::default()
        };
        let transport = ScriptedTransport::answering([Ok(vec![])]);
        let mut tilt = Wt901cDevice::new(&bus, 1, transport, config);

        assert!(matches!(
            tilt.read_once_and_publish(0),
            Err(DeviceError::Decode(_))
        ));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn sequence_only_advances_on_publish() {
        let bus = MetricBus::new();
        let (_sub, seen) = capture(&bus);
        let transport = ScriptedTransport::answering([
            Ok(vec![100, 0]),
            Err(TransportError::Timeout),
            Ok(vec![200, 0]),
        ]);
        let mut tilt = Wt901cDevice::new(&bus, 1, transport, two_register_config());

        assert!(tilt.read_once_and_publish(0).is_ok());
        assert!(tilt.read_once_and_publish(1).is_err());
        assert!(tilt.read_once_and_publish(2).is_ok());

        let sequences: Vec<_> = seen.lock().iter().map(Metric::sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
    }

    // ========================================================================
    // Pacing
    // ========================================================================

    #[test]
    fn tick_honours_poll_interval() {
        let bus = MetricBus::new();
        let (_sub, seen) = capture(&bus);
        let transport = ScriptedTransport::answering((0..4).map(|i| Ok(vec![i * 100, 0])));
        let mut tilt = Wt901cDevice::new(&bus, 1, transport, two_register_config());

        // First tick polls regardless of the clock value
        assert!(tilt.tick(5).unwrap());
        assert!(!tilt.tick(30).unwrap());
        assert!(!tilt.tick(54).unwrap());
        assert!(tilt.tick(55).unwrap());
        assert!(tilt.tick(200).unwrap());

        let stamps: Vec<_> = seen.lock().iter().map(Metric::timestamp_ms).collect();
        assert_eq!(stamps, vec![5, 55, 200]);
        assert_eq!(tilt.transport().requests.len(), 3);
    }

    #[test]
    fn tick_tolerates_clock_going_backwards() {
        let bus = MetricBus::new();
        let transport = ScriptedTransport::answering([Ok(vec![0, 0]), Ok(vec![0, 0])]);
        let mut tilt = Wt901cDevice::new(&bus, 1, transport, two_register_config());

        assert!(tilt.tick(1_000).unwrap());
        assert!(!tilt.tick(10).unwrap());
    }

    #[test]
    fn failed_poll_still_paces() {
        let bus = MetricBus::new();
        let transport =
            ScriptedTransport::answering([Err(TransportError::Timeout), Ok(vec![0, 0])]);
        let mut tilt = Wt901cDevice::new(&bus, 1, transport, two_register_config());

        assert!(tilt.tick(0).is_err());
        assert!(!tilt.tick(10).unwrap());
        assert!(tilt.tick(50).unwrap());
    }

    #[test]
    fn name_includes_address() {
        let bus = MetricBus::new();
        let tilt = Wt901cDevice::new(
            &bus,
            1,
            ScriptedTransport::default(),
            Wt901cConfig::default(),
        );
        assert_eq!(Pollable::name(&tilt), "wt901c@1");
    }
}
