//! The metric bus.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use caravan_types::Metric;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::config::BusConfig;
use crate::error::BusError;
use crate::state::SubscriberTable;
use crate::subscription::{SubscriberId, Subscription};

/// A subscriber callback.
///
/// Held by the bus until the subscriber is cancelled, and never replaced.
pub type Callback = Arc<dyn Fn(&Metric) + Send + Sync>;

thread_local! {
    /// Nesting depth of `publish` calls on the current thread.
    static PUBLISH_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// State shared by all handles of one bus.
pub(crate) struct BusShared {
    pub(crate) table: Mutex<SubscriberTable>,
    pub(crate) config: BusConfig,
}

impl BusShared {
    pub(crate) fn cancel(&self, id: SubscriberId) -> bool {
        let cancelled = self.table.lock().cancel(id);
        if cancelled {
            debug!(subscriber = %id, "unsubscribed");
        }
        cancelled
    }
}

/// Thread-safe fan-out channel for [`Metric`] values.
///
/// `MetricBus` is a handle: cloning it is cheap and every clone refers to the
/// same subscriber table.
///
/// Publishing follows a snapshot-then-deliver protocol. The active subscribers
/// are copied under the bus lock, then the lock is released and the callbacks
/// run in registration order. A subscriber cancelled during delivery still
/// receives the in-flight metric; a subscriber added during delivery does not.
///
/// # Example
///
/// ```rust
/// use caravan_bus::{MetricBus, Metric, MetricKind};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let bus = MetricBus::new();
/// let count = Arc::new(AtomicUsize::new(0));
///
/// let c = count.clone();
/// let mut sub = bus.subscribe(move |_| {
///     c.fetch_add(1, Ordering::Relaxed);
/// });
///
/// let health = Metric::builder(1, MetricKind::Health, 0_i32)
///     .timestamp_ms(100)
///     .sequence(1)
///     .build();
/// assert_eq!(bus.publish(&health), 1);
///
/// sub.unsubscribe();
/// assert_eq!(bus.publish(&health), 0);
/// assert_eq!(count.load(Ordering::Relaxed), 1);
/// ```
#[derive(Clone)]
pub struct MetricBus {
    shared: Arc<BusShared>,
}

impl MetricBus {
    /// Create a bus with default configuration.
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Create a bus with the given configuration.
    ///
    /// A `max_publish_depth` of zero is raised to one so that top-level
    /// publishes always go through.
    pub fn with_config(config: BusConfig) -> Self {
        let config = BusConfig {
            max_publish_depth: config.max_publish_depth.max(1),
            ..config
        };
        Self {
            shared: Arc::new(BusShared {
                table: Mutex::new(SubscriberTable::new(config.compact_threshold)),
                config,
            }),
        }
    }

    /// Create a builder for configuring the bus.
    pub fn builder() -> MetricBusBuilder {
        MetricBusBuilder::new()
    }

    /// Effective configuration, after clamping.
    pub fn config(&self) -> &BusConfig {
        &self.shared.config
    }

    /// Register a callback for every metric published from now on.
    ///
    /// The returned [`Subscription`] cancels the subscriber when dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Metric) + Send + Sync + 'static,
    {
        let id = self.shared.table.lock().insert(Arc::new(callback));
        debug!(subscriber = %id, "subscribed");
        Subscription::new(id, Arc::downgrade(&self.shared))
    }

    /// Cancel a subscriber by id.
    ///
    /// Returns `true` if an active subscriber was cancelled, `false` for ids
    /// that were never issued by this bus or are already cancelled.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.shared.cancel(id)
    }

    /// Deliver a metric to every active subscriber.
    ///
    /// Returns the number of subscribers the metric was delivered to. A publish
    /// rejected by the reentrancy limit delivers nothing, is logged, and
    /// returns 0; use [`MetricBus::try_publish`] to observe the rejection.
    pub fn publish(&self, metric: &Metric) -> usize {
        match self.try_publish(metric) {
            Ok(delivered) => delivered,
            Err(err) => {
                warn!(
                    kind = %metric.kind(),
                    instance = metric.instance_id(),
                    sequence = metric.sequence(),
                    error = %err,
                    "metric dropped"
                );
                0
            }
        }
    }

    /// Deliver a metric to every active subscriber, reporting rejection.
    ///
    /// Each call, nested or not, takes its own snapshot of the subscriber
    /// table. Callbacks run on the calling thread without the bus lock held.
    pub fn try_publish(&self, metric: &Metric) -> Result<usize, BusError> {
        let _depth = DepthGuard::enter(self.shared.config.max_publish_depth)?;

        let recipients = self.shared.table.lock().snapshot();
        trace!(
            kind = %metric.kind(),
            instance = metric.instance_id(),
            sequence = metric.sequence(),
            recipients = recipients.len(),
            "publish"
        );

        for callback in &recipients {
            callback(metric);
        }

        Ok(recipients.len())
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.table.lock().active_count()
    }

    /// Whether `id` names an active subscriber of this bus.
    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.shared.table.lock().is_active(id)
    }

    /// Stored subscriber records, cancelled ones awaiting compaction included.
    pub fn stored_records(&self) -> usize {
        self.shared.table.lock().len()
    }
}

impl Default for MetricBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetricBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricBus")
            .field("subscribers", &self.subscriber_count())
            .field("config", &self.shared.config)
            .finish()
    }
}

/// Builder for configuring a [`MetricBus`].
#[derive(Debug, Default)]
pub struct MetricBusBuilder {
    config: BusConfig,
}

impl MetricBusBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration, e.g. with one loaded from a file.
    pub fn config(mut self, config: BusConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the table size above which cancelled records are compacted.
    pub fn compact_threshold(mut self, threshold: usize) -> Self {
        self.config.compact_threshold = threshold;
        self
    }

    /// Set the maximum nesting depth of `publish` calls.
    pub fn max_publish_depth(mut self, depth: usize) -> Self {
        self.config.max_publish_depth = depth;
        self
    }

    /// Build the bus.
    pub fn build(self) -> MetricBus {
        MetricBus::with_config(self.config)
    }
}

/// Holds one level of publish nesting for the current thread.
///
/// Released on drop, including when a callback panics.
struct DepthGuard {
    // Tied to the thread whose counter it incremented
    _not_send: PhantomData<*const ()>,
}

impl DepthGuard {
    fn enter(limit: usize) -> Result<Self, BusError> {
        PUBLISH_DEPTH.with(|depth| {
            let next = depth.get() + 1;
            if next > limit {
                return Err(BusError::ReentrancyLimit { depth: next, limit });
            }
            depth.set(next);
            Ok(DepthGuard {
                _not_send: PhantomData,
            })
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        PUBLISH_DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caravan_types::{MetricKind, PropertyKey, Quality, Unit};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn health(seq: u32) -> Metric {
        Metric::builder(1, MetricKind::Health, 0_i32)
            .timestamp_ms(100)
            .sequence(seq)
            .property(PropertyKey::Unit, Unit::None)
            .property(PropertyKey::Quality, Quality::Good)
            .build()
    }

    fn current_depth() -> usize {
        PUBLISH_DEPTH.with(Cell::get)
    }

    #[test]
    fn publish_without_subscribers_delivers_nothing() {
        let bus = MetricBus::new();
        assert_eq!(bus.publish(&health(1)), 0);
    }

    #[test]
    fn builder_applies_settings() {
        let bus = MetricBus::builder()
            .compact_threshold(8)
            .max_publish_depth(3)
            .build();

        assert_eq!(bus.config().compact_threshold, 8);
        assert_eq!(bus.config().max_publish_depth, 3);
    }

    #[test]
    fn zero_depth_limit_is_raised_to_one() {
        let bus = MetricBus::builder().max_publish_depth(0).build();
        assert_eq!(bus.config().max_publish_depth, 1);

        let _sub = bus.subscribe(|_| {});
        assert_eq!(bus.try_publish(&health(1)), Ok(1));
    }

    #[test]
    fn clones_share_the_subscriber_table() {
        let bus = MetricBus::new();
        let other = bus.clone();

        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let _sub = other.subscribe(move |_| {
            c.fetch_add(1, Ordering::Relaxed);
        });

        assert_eq!(bus.subscriber_count(), 1);
        bus.publish(&health(1));
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn depth_counter_unwinds_after_publish() {
        let bus = MetricBus::new();
        let _sub = bus.subscribe(|_| {});

        bus.publish(&health(1));
        assert_eq!(current_depth(), 0);
    }

    #[test]
    fn depth_counter_unwinds_after_panicking_callback() {
        let bus = MetricBus::new();
        let _sub = bus.subscribe(|_| panic!("subscriber failure"));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            bus.publish(&health(1));
        }));

        assert!(result.is_err());
        assert_eq!(current_depth(), 0);

        // The bus lock was not held by the callback, so the bus stays usable
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn nested_publish_beyond_limit_is_rejected() {
        let bus = MetricBus::builder().max_publish_depth(2).build();
        let results = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let inner_bus = bus.clone();
        let r = results.clone();
        let _sub = bus.subscribe(move |m| {
            if m.sequence() < 10 {
                let nested = health(m.sequence() + 1);
                // The lock must not be held across the nested publish
                let result = inner_bus.try_publish(&nested);
                r.lock().push(result);
            }
        });

        assert_eq!(bus.try_publish(&health(1)), Ok(1));

        // Depth 2 succeeds and its callback attempts depth 3, which fails
        let results = results.lock();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], Err(BusError::ReentrancyLimit { depth: 3, limit: 2 }));
        assert_eq!(results[1], Ok(1));
    }

    #[test]
    fn debug_output_mentions_subscriber_count() {
        let bus = MetricBus::new();
        let _sub = bus.subscribe(|_| {});
        let rendered = format!("{:?}", bus);
        assert!(rendered.contains("subscribers: 1"));
    }
}
