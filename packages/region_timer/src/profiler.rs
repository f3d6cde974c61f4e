use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::builder::ProfilerConfig;
use crate::clock::Clock;
use crate::pal::PlatformFacade;
use crate::region_stack::{self, RegionStack};
use crate::store::AggregateStore;
use crate::{CompletedRegion, Error, Label, ProfilerBuilder, RegionGuard, Report, Result, label};

/// Distinguishes the thread-local stacks of different profilers.
static NEXT_PROFILER_ID: AtomicU64 = AtomicU64::new(0);

/// Measures labeled regions of code and aggregates their durations per label.
///
/// A region is opened with [`start()`](Self::start) and closed with [`stop()`](Self::stop),
/// or tied to a lexical scope with [`region()`](Self::region). Regions may nest; each thread
/// has its own nesting stack and `stop()` always closes the innermost open region of the
/// calling thread.
///
/// `Profiler` is a cheap handle - clones share the same statistics and may be sent to other
/// threads, whose regions are then aggregated together with those of the original thread.
///
/// Misuse (a `stop()` without a matching `start()`, a thread exiting with open regions) never
/// panics and never affects the caller's control flow. It is logged through `tracing` and
/// counted in the [`Report`].
///
/// # Examples
///
/// ```
/// use region_timer::Profiler;
///
/// let profiler = Profiler::new();
///
/// for _ in 0..4 {
///     profiler.start("forward");
///     // Forward pass.
///     profiler.stop();
///
///     let _backward = profiler.region("backward");
///     // Backward pass, closed when `_backward` goes out of scope.
/// }
///
/// let report = profiler.report();
/// assert_eq!(report.get("forward").unwrap().count(), 4);
/// println!("{report}");
/// ```
#[derive(Clone)]
pub struct Profiler {
    inner: Arc<ProfilerInner>,
}

#[derive(Debug)]
struct ProfilerInner {
    id: u64,
    config: ProfilerConfig,
    clock: Clock,
    store: Arc<AggregateStore>,
}

impl Profiler {
    /// Creates a profiler with the default configuration.
    ///
    /// # Panics
    ///
    /// Panics if the platform does not provide a monotonic clock. Use
    /// [`builder()`](Self::builder) to handle this case without panicking.
    #[expect(
        clippy::new_without_default,
        reason = "creating a profiler probes the platform clock, which is not a default-like operation"
    )]
    #[must_use]
    pub fn new() -> Self {
        Self::builder()
            .build()
            .expect("region timing requires a monotonic platform clock")
    }

    /// Starts configuring a profiler.
    pub fn builder() -> ProfilerBuilder {
        ProfilerBuilder::new()
    }

    pub(crate) fn from_parts(config: ProfilerConfig, platform: PlatformFacade) -> Result<Self> {
        let clock = Clock::new(platform)?;

        Ok(Self {
            inner: Arc::new(ProfilerInner {
                id: NEXT_PROFILER_ID.fetch_add(1, Ordering::Relaxed),
                config,
                clock,
                store: Arc::new(AggregateStore::new()),
            }),
        })
    }

    /// Whether this profiler measures anything.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.config.enabled
    }

    /// Opens a region on the current thread.
    ///
    /// The region is closed by the next [`stop()`](Self::stop) on the same thread that is
    /// not claimed by a region opened later. An empty label is recorded as
    /// [`UNLABELED`][crate::UNLABELED].
    pub fn start(&self, label: impl Into<Label>) {
        self.start_region(label.into());
    }

    /// Opens a region, returning its depth if it was actually opened.
    pub(crate) fn start_region(&self, label: Label) -> Option<usize> {
        if !self.inner.config.enabled {
            return None;
        }

        let (label, replaced) = label::normalize(label);

        if replaced && self.inner.config.log_misuse {
            tracing::warn!(
                profiler = self.inner.id,
                "region started with an empty label, recording it as {}",
                crate::UNLABELED
            );
        }

        let depth = region_stack::with_stacks(|stacks| {
            // New stacks are rare, so this is where a thread forgets dropped profilers.
            if !stacks.contains_key(&self.inner.id) {
                region_stack::prune_orphaned(stacks);
            }

            stacks
                .entry(self.inner.id)
                .or_insert_with(|| self.inner.new_stack())
                .push(label)
        });

        if depth.is_none() && self.inner.config.log_misuse {
            tracing::warn!(
                profiler = self.inner.id,
                "region started while the thread is exiting, ignoring it"
            );
        }

        depth
    }

    /// Closes the innermost open region of the current thread and records its duration.
    ///
    /// If the thread has no open region, a warning is logged, the mismatch is counted in
    /// the report and nothing else happens.
    pub fn stop(&self) {
        let result = self.try_stop();

        if !self.inner.config.enabled || !self.inner.config.log_misuse {
            return;
        }

        if let Err(e) = result {
            tracing::warn!(profiler = self.inner.id, "{e}");
        }
    }

    /// Closes the innermost open region of the current thread and records its duration,
    /// returning the measurement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MismatchedRegion`] if the current thread has no open region. The
    /// mismatch is counted in the report (unless the profiler is disabled) but not logged.
    pub fn try_stop(&self) -> Result<CompletedRegion> {
        if !self.inner.config.enabled {
            return Err(Error::MismatchedRegion);
        }

        let popped = region_stack::with_stacks(|stacks| {
            stacks
                .get_mut(&self.inner.id)
                .map_or(Err(Error::MismatchedRegion), RegionStack::pop)
        })
        .unwrap_or(Err(Error::MismatchedRegion));

        match popped {
            Ok(region) => {
                tracing::trace!(
                    profiler = self.inner.id,
                    label = region.label(),
                    depth = region.depth(),
                    duration = ?region.duration(),
                    "region completed"
                );

                self.inner
                    .store
                    .record(region.label_ref(), region.duration(), region.self_time());

                Ok(region)
            }
            Err(e) => {
                self.inner.store.record_mismatched_stop();
                Err(e)
            }
        }
    }

    /// Opens a region that is closed when the returned guard is dropped.
    ///
    /// The region is closed on every exit path from the scope holding the guard, including
    /// early returns, `break` and `?`.
    ///
    /// # Examples
    ///
    /// ```
    /// use region_timer::Profiler;
    ///
    /// let profiler = Profiler::new();
    ///
    /// for step in 0.. {
    ///     let _step = profiler.region("step");
    ///
    ///     if step == 3 {
    ///         break; // The "step" region is still closed.
    ///     }
    /// }
    ///
    /// assert_eq!(profiler.report().get("step").unwrap().count(), 4);
    /// ```
    pub fn region(&self, label: impl Into<Label>) -> RegionGuard {
        let depth = self.start_region(label.into());
        RegionGuard::new(self.clone(), depth)
    }

    /// Runs `f` inside a region and returns its result.
    pub fn measure<F, R>(&self, label: impl Into<Label>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _region = self.region(label);
        f()
    }

    /// Number of regions currently open on the calling thread.
    #[must_use]
    pub fn open_regions(&self) -> usize {
        region_stack::with_stacks(|stacks| stacks.get(&self.inner.id).map_or(0, RegionStack::depth))
            .unwrap_or(0)
    }

    /// Captures the current statistics of all labels.
    ///
    /// Regions still open on any thread are not included.
    #[must_use]
    pub fn report(&self) -> Report {
        Report::from_snapshot(self.inner.store.snapshot(), self.inner.config.track_self_time)
    }

    /// Discards all statistics and starts a new session.
    ///
    /// Regions that are open while the reset happens are not affected. When they are
    /// stopped, they are recorded into the new session.
    pub fn reset(&self) {
        let session = self.inner.store.reset();
        tracing::debug!(profiler = self.inner.id, session, "statistics reset");
    }

    /// Marker of the current session, incremented by every [`reset()`](Self::reset).
    ///
    /// Compare with [`Report::session()`] to detect a report taken before a reset.
    #[must_use]
    pub fn session(&self) -> u64 {
        self.inner.store.session()
    }

    /// Closes the region stack of the calling thread, reporting any region still open on it.
    ///
    /// This happens automatically when a thread exits but the thread-local cleanup of the
    /// main thread is not guaranteed to run at process exit, so call this before exiting if
    /// you want open regions in `main()` to be reported.
    ///
    /// Returns one [`Error::UnclosedRegion`] per region that was still open, innermost first.
    /// The thread may keep using the profiler afterwards.
    pub fn finish_thread(&self) -> Vec<Error> {
        self.inner.finish_thread()
    }
}

impl ProfilerInner {
    fn new_stack(&self) -> RegionStack {
        RegionStack::new(
            self.clock.clone(),
            Arc::downgrade(&self.store),
            self.config.track_self_time,
            self.config.log_misuse,
        )
    }

    fn finish_thread(&self) -> Vec<Error> {
        region_stack::with_stacks(|stacks| stacks.remove(&self.id))
            .flatten()
            .map_or_else(Vec::new, |mut stack| stack.drain_unclosed())
    }
}

impl Drop for ProfilerInner {
    fn drop(&mut self) {
        // Other threads drop their stacks for this profiler when they exit or open a region
        // for another profiler.
        drop(self.finish_thread());
    }
}

impl fmt::Debug for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profiler")
            .field("id", &self.inner.id)
            .field("config", &self.inner.config)
            .field("session", &self.session())
            .finish_non_exhaustive()
    }
}
