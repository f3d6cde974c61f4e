//! Process-wide profiler, for instrumenting code that has no convenient way to pass a
//! [`Profiler`] handle around.
//!
//! The lifecycle is explicit: nothing is measured before [`init()`] or after [`shutdown()`].
//! Calls made outside that window are accepted, do nothing and log a single warning per
//! process.
//!
//! ```
//! use region_timer::global;
//!
//! global::init();
//!
//! for _ in 0..4 {
//!     global::start("forward");
//!     // Forward pass.
//!     global::stop();
//! }
//!
//! let report = global::shutdown().expect("initialized above");
//! assert_eq!(report.get("forward").unwrap().count(), 4);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;

use crate::{Label, Profiler, ProfilerBuilder, RegionGuard, Report};

/// We use `ArcSwap` here because the profiler is read on every start and stop from every
/// thread but only written by init and shutdown.
static GLOBAL_PROFILER: ArcSwapOption<Profiler> = ArcSwapOption::const_empty();

static WARNED_UNINITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the process-wide profiler with the default configuration.
///
/// If the profiler is already initialized, returns the existing one.
///
/// # Panics
///
/// Panics if the platform does not provide a monotonic clock.
pub fn init() -> Profiler {
    init_with(Profiler::builder())
}

/// Initializes the process-wide profiler with a custom configuration.
///
/// If the profiler is already initialized, the builder is discarded and the existing
/// profiler is returned.
///
/// # Panics
///
/// Panics if the platform does not provide a monotonic clock.
pub fn init_with(builder: ProfilerBuilder) -> Profiler {
    let current = GLOBAL_PROFILER.load();

    if let Some(existing) = &*current {
        tracing::debug!("process-wide profiler already initialized");
        return Profiler::clone(existing);
    }

    let profiler = builder
        .build()
        .expect("region timing requires a monotonic platform clock");

    let previous =
        GLOBAL_PROFILER.compare_and_swap(&*current, Some(Arc::new(profiler.clone())));

    if let Some(winner) = &*previous {
        // Another thread initialized it concurrently. Theirs wins.
        return Profiler::clone(winner);
    }

    WARNED_UNINITIALIZED.store(false, Ordering::Relaxed);
    tracing::debug!(session = profiler.session(), "process-wide profiler initialized");

    profiler
}

/// Shuts down the process-wide profiler, returning its final report.
///
/// Regions still open on the calling thread are reported as unclosed before the report is
/// taken. Returns `None` if the profiler was not initialized.
///
/// Handles obtained earlier via [`init()`] or [`profiler()`] keep working but are no longer
/// reachable through the free functions of this module.
pub fn shutdown() -> Option<Report> {
    let profiler = GLOBAL_PROFILER.swap(None)?;

    let unclosed = profiler.finish_thread();
    let report = profiler.report();

    tracing::debug!(
        unclosed = unclosed.len(),
        regions = report.len(),
        "process-wide profiler shut down"
    );

    Some(report)
}

/// The process-wide profiler, if initialized.
#[must_use]
pub fn profiler() -> Option<Profiler> {
    GLOBAL_PROFILER.load_full().map(|profiler| Profiler::clone(&profiler))
}

/// Whether the process-wide profiler is initialized.
#[must_use]
pub fn is_initialized() -> bool {
    GLOBAL_PROFILER.load().is_some()
}

fn with_profiler<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&Profiler) -> R,
{
    let current = GLOBAL_PROFILER.load();

    if let Some(profiler) = &*current {
        Some(f(profiler))
    } else {
        if !WARNED_UNINITIALIZED.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                "process-wide profiler used before init() or after shutdown(), ignoring the call"
            );
        }

        None
    }
}

/// Opens a region on the current thread. See [`Profiler::start()`].
pub fn start(label: impl Into<Label>) {
    let label = label.into();
    with_profiler(move |profiler| profiler.start(label));
}

/// Closes the innermost open region of the current thread. See [`Profiler::stop()`].
pub fn stop() {
    with_profiler(Profiler::stop);
}

/// Opens a region that is closed when the returned guard is dropped.
/// See [`Profiler::region()`].
pub fn region(label: impl Into<Label>) -> RegionGuard {
    let label = label.into();
    with_profiler(move |profiler| profiler.region(label)).unwrap_or_else(RegionGuard::inert)
}

/// Captures the current statistics. Empty if the profiler is not initialized.
#[must_use]
pub fn report() -> Report {
    with_profiler(Profiler::report).unwrap_or_default()
}

/// Discards all statistics and starts a new session. See [`Profiler::reset()`].
pub fn reset() {
    with_profiler(Profiler::reset);
}
