//! Subscriber identities and the owning cancellation handle.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

use crate::bus::BusShared;

/// Source of subscriber ids; shared by every bus in the process.
static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a subscriber.
///
/// Ids are handed out in increasing order starting at 1. Zero is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Wrap a raw id, e.g. one received from elsewhere in the process.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id value.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    pub(crate) fn next() -> Self {
        Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owning handle for one subscriber.
///
/// Holding a `Subscription` is the right to cancel its subscriber. The handle
/// cannot be cloned; moving it moves the right. Cancellation happens exactly
/// once: on the first call to [`Subscription::unsubscribe`] or when the handle
/// is dropped, whichever comes first.
///
/// The handle does not keep the bus alive. If the bus is gone, cancelling is a
/// no-op.
///
/// # Example
///
/// ```rust
/// use caravan_bus::MetricBus;
///
/// let bus = MetricBus::new();
/// {
///     let _sub = bus.subscribe(|_| {});
///     assert_eq!(bus.subscriber_count(), 1);
/// } // Cancelled here
/// assert_eq!(bus.subscriber_count(), 0);
/// ```
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
    id: SubscriberId,
    bus: Option<Weak<BusShared>>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, bus: Weak<BusShared>) -> Self {
        Self { id, bus: Some(bus) }
    }

    /// The id of the subscriber this handle controls.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Whether the subscriber is still receiving metrics.
    ///
    /// Also false if the subscriber was cancelled by id through
    /// [`MetricBus::unsubscribe`](crate::MetricBus::unsubscribe).
    pub fn is_active(&self) -> bool {
        self.bus
            .as_ref()
            .and_then(Weak::upgrade)
            .map_or(false, |shared| shared.table.lock().is_active(self.id))
    }

    /// Cancel the subscriber.
    ///
    /// Returns `true` only if this call performed the cancellation. Later calls,
    /// and calls after the subscriber was cancelled by id, return `false`.
    pub fn unsubscribe(&mut self) -> bool {
        match self.bus.take().and_then(|weak| weak.upgrade()) {
            Some(shared) => shared.cancel(self.id),
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("owned", &self.bus.is_some())
            .finish()
    }
}
