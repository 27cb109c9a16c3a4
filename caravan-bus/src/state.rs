//! Subscriber table owned by a bus.

use tracing::debug;

use crate::bus::Callback;
use crate::subscription::SubscriberId;

/// One registered subscriber.
///
/// `callback` is `None` once cancelled and never comes back. Cancelling
/// releases the table's reference to the callback right away, so whatever
/// the closure captured is freed as soon as in-flight snapshots finish.
pub(crate) struct Subscriber {
    pub id: SubscriberId,
    pub callback: Option<Callback>,
}

impl Subscriber {
    fn is_active(&self) -> bool {
        self.callback.is_some()
    }
}

/// Registration-ordered subscriber records.
///
/// Not synchronized; the bus wraps it in a mutex. Entries are appended with
/// increasing ids, so the vector stays sorted by id and lookups can bisect.
pub(crate) struct SubscriberTable {
    entries: Vec<Subscriber>,
    compact_threshold: usize,
}

impl SubscriberTable {
    pub fn new(compact_threshold: usize) -> Self {
        Self {
            entries: Vec::new(),
            compact_threshold,
        }
    }

    /// Register a new active subscriber and return its freshly issued id.
    ///
    /// The id is allocated while the caller holds the table, which keeps
    /// registration order and id order identical.
    pub fn insert(&mut self, callback: Callback) -> SubscriberId {
        let id = SubscriberId::next();
        self.entries.push(Subscriber {
            id,
            callback: Some(callback),
        });
        id
    }

    /// Cancel a subscriber and release its callback.
    ///
    /// Returns `false` for unknown or already cancelled ids. A successful
    /// cancellation may trigger compaction of cancelled records.
    pub fn cancel(&mut self, id: SubscriberId) -> bool {
        let cancelled = match self.position(id) {
            Some(index) => self.entries[index].callback.take().is_some(),
            None => false,
        };

        if cancelled && self.entries.len() > self.compact_threshold {
            self.compact();
        }

        cancelled
    }

    /// Drop every cancelled record. Returns how many were removed.
    pub fn compact(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(Subscriber::is_active);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "compacted subscriber table");
        }
        removed
    }

    /// Callbacks of all active subscribers, in registration order.
    pub fn snapshot(&self) -> Vec<Callback> {
        self.entries
            .iter()
            .filter_map(|s| s.callback.clone())
            .collect()
    }

    pub fn is_active(&self, id: SubscriberId) -> bool {
        self.position(id)
            .is_some_and(|index| self.entries[index].is_active())
    }

    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|s| s.is_active()).count()
    }

    /// Stored records, cancelled ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn position(&self, id: SubscriberId) -> Option<usize> {
        self.entries.binary_search_by_key(&id, |s| s.id).ok()
    }
}
