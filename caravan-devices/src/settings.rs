//! Node configuration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use caravan_bus::{BusConfig, MetricBus};
use caravan_hal::{Clock, RegisterTransport};
use caravan_types::InstanceId;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::DeviceError;
use crate::poller::Poller;
use crate::tilt::{Wt901cConfig, Wt901cDevice};

/// Environment variable prefix for overrides, e.g. `CARAVAN__POLLER__INTERVAL_MS`.
pub const ENV_PREFIX: &str = "CARAVAN";

/// Everything needed to bring up a sensor node.
///
/// ```toml
/// [bus]
/// max_publish_depth = 8
///
/// [poller]
/// interval_ms = 20
///
/// [[tilt]]
/// instance_id = 4609
///
/// [tilt.device]
/// modbus_addr = 2
/// poll_interval_ms = 100
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    /// Bus limits.
    pub bus: BusConfig,
    /// Background polling.
    pub poller: PollerSettings,
    /// Tilt sensors, one entry per `[[tilt]]` table.
    pub tilt: Vec<TiltSettings>,
}

/// Settings for the background poller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerSettings {
    /// Background tick period.
    pub interval_ms: u64,
}

impl PollerSettings {
    /// `interval_ms` as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self { interval_ms: 10 }
    }
}

/// One WT901C on the field bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiltSettings {
    /// Instance id stamped on the device's metrics.
    pub instance_id: InstanceId,
    /// Register layout and pacing.
    #[serde(default)]
    pub device: Wt901cConfig,
}

impl NodeSettings {
    /// Load settings from a file, with `CARAVAN__*` environment overrides.
    ///
    /// The file format follows the extension (`.toml`, `.json`, `.yaml`, ...).
    pub fn load(path: &Path) -> Result<Self, DeviceError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// Like [`load`](Self::load) with a custom environment prefix.
    pub fn load_with_prefix(path: &Path, env_prefix: &str) -> Result<Self, DeviceError> {
        let settings = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Parse settings from a TOML string, without environment overrides.
    pub fn from_toml(toml: &str) -> Result<Self, DeviceError> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Create the bus described by these settings.
    pub fn build_bus(&self) -> MetricBus {
        MetricBus::builder().config(self.bus.clone()).build()
    }

    /// Create one tilt device per `[[tilt]]` entry, asking `make_transport`
    /// for each device's transport.
    pub fn tilt_devices<T, F>(
        &self,
        bus: &MetricBus,
        mut make_transport: F,
    ) -> Vec<Wt901cDevice<T>>
    where
        T: RegisterTransport,
        F: FnMut(&TiltSettings) -> T,
    {
        self.tilt
            .iter()
            .map(|tilt| {
                let transport = make_transport(tilt);
                Wt901cDevice::new(bus, tilt.instance_id, transport, tilt.device.clone())
            })
            .collect()
    }

    /// Create a poller over all configured devices.
    pub fn build_poller<T, F>(
        &self,
        bus: &MetricBus,
        clock: Arc<dyn Clock>,
        make_transport: F,
    ) -> Poller
    where
        T: RegisterTransport + 'static,
        F: FnMut(&TiltSettings) -> T,
    {
        self.tilt_devices(bus, make_transport)
            .into_iter()
            .fold(Poller::builder(), |builder, device| builder.device(device))
            .clock(clock)
            .interval(self.poller.interval())
            .build()
    }
}
