//! Periodic device polling.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use caravan_hal::{Clock, SystemClock};
use tracing::{debug, warn};

use crate::error::DeviceError;

/// A device driven by periodic ticks.
pub trait Pollable: Send {
    /// Short label for logs.
    fn name(&self) -> &str;

    /// Give the device a chance to poll at `now_ms`.
    ///
    /// Returns `Ok(true)` if a reading was published.
    fn tick(&mut self, now_ms: u64) -> Result<bool, DeviceError>;
}

impl<P: Pollable + ?Sized> Pollable for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn tick(&mut self, now_ms: u64) -> Result<bool, DeviceError> {
        (**self).tick(now_ms)
    }
}

/// Outcome of one [`Poller::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Devices that published a reading.
    pub published: usize,
    /// Devices whose poll failed.
    pub failed: usize,
}

/// Ticks a set of devices against a shared clock.
///
/// Failures are logged and never stop the other devices from being polled.
///
/// # Example
///
/// ```rust
/// use caravan_bus::MetricBus;
/// use caravan_devices::{Poller, Wt901cConfig, Wt901cDevice};
/// use caravan_hal::{DummyTransport, ManualClock};
/// use std::sync::Arc;
///
/// let bus = MetricBus::new();
/// let clock = Arc::new(ManualClock::new(0));
/// let mut poller = Poller::builder()
///     .clock(clock.clone())
///     .device(Wt901cDevice::new(&bus, 1, DummyTransport::new(), Wt901cConfig::default()))
///     .build();
///
/// assert_eq!(poller.tick().published, 1);
/// clock.advance(10);
/// assert_eq!(poller.tick().published, 0);
/// ```
pub struct Poller {
    devices: Vec<Box<dyn Pollable>>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl Poller {
    /// Create a builder for configuring the poller.
    pub fn builder() -> PollerBuilder {
        PollerBuilder::new()
    }

    /// Tick period of the background task.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether no devices are registered.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Tick every device once at the clock's current time.
    pub fn tick(&mut self) -> TickSummary {
        let now_ms = self.clock.now_millis();
        let mut summary = TickSummary::default();

        for device in &mut self.devices {
            match device.tick(now_ms) {
                Ok(true) => summary.published += 1,
                Ok(false) => {}
                Err(err) => {
                    summary.failed += 1;
                    warn!(device = device.name(), now_ms, error = %err, "device poll failed");
                }
            }
        }

        if summary.published > 0 || summary.failed > 0 {
            debug!(now_ms, published = summary.published, failed = summary.failed, "poll tick");
        }
        summary
    }

    /// Start polling in a background task.
    ///
    /// The poller is moved into a tokio task that ticks every
    /// [`interval`](Self::interval). Returns a handle that stops it.
    #[cfg(feature = "tokio")]
    pub fn start(self) -> PollHandle {
        use tokio::sync::watch;

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut poller = self;

        let task = tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(poller.interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut stop_rx = stop_rx;

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        poller.tick();
                    }
                    changed = stop_rx.changed() => {
                        // A dropped handle also stops the loop
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            debug!(devices = poller.len(), "poller stopped");
            poller
        });

        PollHandle { stop_tx, task }
    }
}

impl fmt::Debug for Poller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.devices.iter().map(|d| d.name()).collect();
        f.debug_struct("Poller")
            .field("devices", &names)
            .field("interval", &self.interval)
            .finish()
    }
}

/// Builder for configuring a [`Poller`].
#[derive(Default)]
pub struct PollerBuilder {
    devices: Vec<Box<dyn Pollable>>,
    clock: Option<Arc<dyn Clock>>,
    interval: Option<Duration>,
}

impl PollerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device. Devices are ticked in the order they were added.
    pub fn device(mut self, device: impl Pollable + 'static) -> Self {
        self.devices.push(Box::new(device));
        self
    }

    /// Add several boxed devices.
    pub fn devices(mut self, devices: impl IntoIterator<Item = Box<dyn Pollable>>) -> Self {
        self.devices.extend(devices);
        self
    }

    /// Set the time source. Defaults to a [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the background tick interval. Defaults to 10 ms.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Build the poller.
    pub fn build(self) -> Poller {
        Poller {
            devices: self.devices,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock::new())),
            interval: self.interval.unwrap_or(Poller::DEFAULT_INTERVAL),
        }
    }
}

impl Poller {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);
}

/// Handle for controlling background polling.
///
/// Drop this handle to stop polling, or call `stop()` explicitly.
#[cfg(feature = "tokio")]
pub struct PollHandle {
    stop_tx: tokio::sync::watch::Sender<bool>,
    task: tokio::task::JoinHandle<Poller>,
}

#[cfg(feature = "tokio")]
impl PollHandle {
    /// Stop background polling.
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop background polling and wait for the task, getting the poller back.
    ///
    /// Returns `None` if the task panicked or was cancelled.
    pub async fn shutdown(self) -> Option<Poller> {
        let _ = self.stop_tx.send(true);
        self.task.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caravan_hal::{ManualClock, TransportError};
    use parking_lot::Mutex;

    /// Records the time of every tick; fails on the listed times.
    struct FakeDevice {
        name: String,
        ticks: Arc<Mutex<Vec<u64>>>,
        fail_at: Vec<u64>,
    }

    impl FakeDevice {
        fn new(name: &str) -> (Self, Arc<Mutex<Vec<u64>>>) {
            let ticks = Arc::new(Mutex::new(Vec::new()));
            let device = Self {
                name: name.to_string(),
                ticks: ticks.clone(),
                fail_at: Vec::new(),
            };
            (device, ticks)
        }
    }

    impl Pollable for FakeDevice {
        fn name(&self) -> &str {
            &self.name
        }

        fn tick(&mut self, now_ms: u64) -> Result<bool, DeviceError> {
            self.ticks.lock().push(now_ms);
            if self.fail_at.contains(&now_ms) {
                return Err(TransportError::Timeout.into());
            }
            Ok(true)
        }
    }

    #[test]
    fn builder_defaults() {
        let poller = Poller::builder().build();
        assert!(poller.is_empty());
        assert_eq!(poller.interval(), Duration::from_millis(10));
    }

    #[test]
    fn tick_passes_clock_time_to_every_device() {
        let clock = Arc::new(ManualClock::new(100));
        let (a, a_ticks) = FakeDevice::new("a");
        let (b, b_ticks) = FakeDevice::new("b");
        let mut poller = Poller::builder().clock(clock.clone()).device(a).device(b).build();

        assert_eq!(poller.tick(), TickSummary { published: 2, failed: 0 });
        clock.advance(25);
        poller.tick();

        assert_eq!(*a_ticks.lock(), vec![100, 125]);
        assert_eq!(*b_ticks.lock(), vec![100, 125]);
    }

    #[test]
    fn failing_device_does_not_stop_the_others() {
        let clock = Arc::new(ManualClock::new(0));
        let (mut flaky, flaky_ticks) = FakeDevice::new("flaky");
        flaky.fail_at = vec![0];
        let (steady, steady_ticks) = FakeDevice::new("steady");

        let mut poller = Poller::builder()
            .clock(clock.clone())
            .device(flaky)
            .device(steady)
            .build();

        assert_eq!(poller.tick(), TickSummary { published: 1, failed: 1 });
        clock.advance(1);
        assert_eq!(poller.tick(), TickSummary { published: 2, failed: 0 });

        assert_eq!(flaky_ticks.lock().len(), 2);
        assert_eq!(steady_ticks.lock().len(), 2);
    }

    #[test]
    fn boxed_devices_can_be_added_in_bulk() {
        let (a, _) = FakeDevice::new("a");
        let (b, _) = FakeDevice::new("b");
        let boxed: Vec<Box<dyn Pollable>> = vec![Box::new(a), Box::new(b)];

        let poller = Poller::builder().devices(boxed).build();
        assert_eq!(poller.len(), 2);
        assert!(format!("{:?}", poller).contains("\"a\", \"b\""));
    }

    #[cfg(feature = "tokio")]
    #[tokio::test(start_paused = true)]
    async fn background_polling_ticks_until_stopped() {
        let (device, ticks) = FakeDevice::new("bg");
        let poller = Poller::builder()
            .clock(Arc::new(ManualClock::new(0)))
            .interval(Duration::from_millis(10))
            .device(device)
            .build();

        let handle = poller.start();
        tokio::time::sleep(Duration::from_millis(35)).await;

        let poller = handle.shutdown().await.expect("poller task");
        let count = ticks.lock().len();
        assert!(count >= 3, "expected at least 3 ticks, got {count}");
        assert_eq!(poller.len(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ticks.lock().len(), count);
    }

    #[cfg(feature = "tokio")]
    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_polling() {
        let (device, ticks) = FakeDevice::new("dropped");
        let poller = Poller::builder()
            .clock(Arc::new(ManualClock::new(0)))
            .device(device)
            .build();

        let handle = poller.start();
        tokio::time::sleep(Duration::from_millis(25)).await;
        drop(handle);

        // Let the task observe the closed channel
        tokio::time::sleep(Duration::from_millis(1)).await;
        let count = ticks.lock().len();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ticks.lock().len(), count);
    }
}
