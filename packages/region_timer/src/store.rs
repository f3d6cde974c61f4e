//! Shared per-label statistics, written to by every thread that completes a region.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use foldhash::{HashMap, HashMapExt};

use crate::record::AggregateRecord;
use crate::{ERR_POISONED_LOCK, Label};

/// The misuse counters are only ever read as a whole under the records lock,
/// so the atomics themselves need no ordering guarantees.
const COUNTER_ORDERING: Ordering = Ordering::Relaxed;

/// Maps each label to its running statistics.
///
/// The outer lock protects the set of labels; each record has its own lock so that
/// threads recording different labels never contend with each other after the first
/// observation of a label. `reset()` and `snapshot()` take the outer lock, which means
/// neither can ever see a record in the middle of an update.
#[derive(Debug)]
pub(crate) struct AggregateStore {
    records: RwLock<HashMap<Label, Mutex<AggregateRecord>>>,

    // Bumped by every reset. Written only under the records write lock.
    session: AtomicU64,

    mismatched_stops: AtomicU64,
    unclosed_regions: AtomicU64,
}

/// Immutable copy of the store contents at one point in time.
#[derive(Clone, Debug, Default)]
pub(crate) struct StoreSnapshot {
    pub(crate) session: u64,
    pub(crate) records: Vec<(Label, AggregateRecord)>,
    pub(crate) mismatched_stops: u64,
    pub(crate) unclosed_regions: u64,
}

impl AggregateStore {
    pub(crate) fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            session: AtomicU64::new(0),
            mismatched_stops: AtomicU64::new(0),
            unclosed_regions: AtomicU64::new(0),
        }
    }

    /// Adds one completed region to the statistics of its label.
    pub(crate) fn record(&self, label: &Label, duration: Duration, self_time: Duration) {
        {
            let records = self.records.read().expect(ERR_POISONED_LOCK);

            // The read lock is held during the update so a concurrent reset cannot
            // discard the record between lookup and update.
            if let Some(record) = records.get(&**label) {
                record
                    .lock()
                    .expect(ERR_POISONED_LOCK)
                    .add(duration, self_time);
                return;
            }
        }

        // First observation of this label (in this session). Another thread may have
        // inserted it since we released the read lock, which `entry()` takes care of.
        let mut records = self.records.write().expect(ERR_POISONED_LOCK);

        records
            .entry(label.clone())
            .or_default()
            .get_mut()
            .expect(ERR_POISONED_LOCK)
            .add(duration, self_time);
    }

    pub(crate) fn record_mismatched_stop(&self) {
        let _records = self.records.read().expect(ERR_POISONED_LOCK);
        self.mismatched_stops.fetch_add(1, COUNTER_ORDERING);
    }

    pub(crate) fn record_unclosed_region(&self) {
        let _records = self.records.read().expect(ERR_POISONED_LOCK);
        self.unclosed_regions.fetch_add(1, COUNTER_ORDERING);
    }

    /// Discards all statistics and starts a new session.
    ///
    /// Returns the new session marker.
    pub(crate) fn reset(&self) -> u64 {
        let mut records = self.records.write().expect(ERR_POISONED_LOCK);

        records.clear();
        self.mismatched_stops.store(0, COUNTER_ORDERING);
        self.unclosed_regions.store(0, COUNTER_ORDERING);

        let previous = self.session.fetch_add(1, COUNTER_ORDERING);
        previous.wrapping_add(1)
    }

    pub(crate) fn session(&self) -> u64 {
        self.session.load(COUNTER_ORDERING)
    }

    pub(crate) fn snapshot(&self) -> StoreSnapshot {
        let records = self.records.read().expect(ERR_POISONED_LOCK);

        StoreSnapshot {
            session: self.session.load(COUNTER_ORDERING),
            records: records
                .iter()
                .map(|(label, record)| {
                    (
                        label.clone(),
                        record.lock().expect(ERR_POISONED_LOCK).clone(),
                    )
                })
                .collect(),
            mismatched_stops: self.mismatched_stops.load(COUNTER_ORDERING),
            unclosed_regions: self.unclosed_regions.load(COUNTER_ORDERING),
        }
    }
}
