//! Per-thread stacks of regions that have been started but not yet stopped.

use std::cell::RefCell;
use std::mem;
use std::sync::Weak;
use std::time::{Duration, Instant};

use foldhash::{HashMap, HashMapExt};

use crate::clock::Clock;
use crate::store::AggregateStore;
use crate::{Error, Label, Result};

thread_local! {
    /// One stack per profiler that has been used on this thread, keyed by profiler ID.
    ///
    /// Dropped when the thread exits, which is what triggers the unclosed region check.
    static REGION_STACKS: RefCell<HashMap<u64, RegionStack>> = RefCell::new(HashMap::new());
}

/// Runs `f` with the region stacks of the current thread.
///
/// Returns `None` if the thread is already tearing down its thread-local state,
/// in which case no regions can be started or stopped any more.
pub(crate) fn with_stacks<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut HashMap<u64, RegionStack>) -> R,
{
    REGION_STACKS
        .try_with(|stacks| f(&mut stacks.borrow_mut()))
        .ok()
}

/// Drops the stacks of profilers that no longer exist.
///
/// Regions still open on an orphaned stack are reported as unclosed, with nowhere to count them.
pub(crate) fn prune_orphaned(stacks: &mut HashMap<u64, RegionStack>) {
    stacks.retain(|_, stack| !stack.is_orphaned());
}

#[derive(Debug)]
struct RegionEntry {
    label: Label,
    start_time: Instant,
    depth: usize,

    // Sum of the inclusive durations of directly nested regions stopped so far.
    children: Duration,
}

/// A region that has just been stopped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompletedRegion {
    label: Label,
    duration: Duration,
    self_time: Duration,
    depth: usize,
}

impl CompletedRegion {
    /// The label the region was started with.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Time from start to stop, including any nested regions.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Time from start to stop minus the time spent in directly nested regions.
    ///
    /// Equal to [`duration()`](Self::duration) if self time tracking is disabled.
    #[must_use]
    pub fn self_time(&self) -> Duration {
        self.self_time
    }

    /// Nesting depth of the region, 0 being the outermost.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn label_ref(&self) -> &Label {
        &self.label
    }
}

/// Regions in flight on one thread for one profiler, innermost last.
#[derive(Debug)]
pub(crate) struct RegionStack {
    entries: Vec<RegionEntry>,
    clock: Clock,

    // Receives the unclosed region count when the stack is dropped with entries on it.
    // Weak so that a thread does not keep the statistics of a dropped profiler alive.
    store: Weak<AggregateStore>,

    track_self_time: bool,
    log_misuse: bool,
}

impl RegionStack {
    pub(crate) fn new(
        clock: Clock,
        store: Weak<AggregateStore>,
        track_self_time: bool,
        log_misuse: bool,
    ) -> Self {
        Self {
            entries: Vec::new(),
            clock,
            store,
            track_self_time,
            log_misuse,
        }
    }

    /// Opens a region. Returns its nesting depth.
    pub(crate) fn push(&mut self, label: Label) -> usize {
        let depth = self.entries.len();

        self.entries.push(RegionEntry {
            label,
            start_time: self.clock.now(),
            depth,
            children: Duration::ZERO,
        });

        depth
    }

    /// Closes the innermost open region.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MismatchedRegion`] if there is no open region.
    pub(crate) fn pop(&mut self) -> Result<CompletedRegion> {
        let end_time = self.clock.now();

        let entry = self.entries.pop().ok_or(Error::MismatchedRegion)?;
        let duration = Clock::elapsed(entry.start_time, end_time);

        let self_time = if self.track_self_time {
            if let Some(parent) = self.entries.last_mut() {
                parent.children = parent.children.saturating_add(duration);
            }

            duration.saturating_sub(entry.children)
        } else {
            duration
        };

        Ok(CompletedRegion {
            label: entry.label,
            duration,
            self_time,
            depth: entry.depth,
        })
    }

    pub(crate) fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Whether the profiler this stack belongs to has been dropped.
    ///
    /// Such a stack can never be used again because profiler IDs are not reused.
    pub(crate) fn is_orphaned(&self) -> bool {
        self.store.strong_count() == 0
    }

    /// Removes every open region, reporting each one as unclosed, innermost first.
    pub(crate) fn drain_unclosed(&mut self) -> Vec<Error> {
        let entries = mem::take(&mut self.entries);

        entries
            .into_iter()
            .rev()
            .map(|entry| {
                if let Some(store) = self.store.upgrade() {
                    store.record_unclosed_region();
                }

                if self.log_misuse {
                    tracing::warn!(
                        label = %entry.label,
                        depth = entry.depth,
                        "region was never closed"
                    );
                }

                Error::UnclosedRegion {
                    label: entry.label,
                    depth: entry.depth,
                }
            })
            .collect()
    }
}

impl Drop for RegionStack {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            drop(self.drain_unclosed());
        }
    }
}
