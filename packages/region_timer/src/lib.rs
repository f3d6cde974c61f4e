#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Measures the elapsed time of labeled, possibly nested, possibly repeated regions of code
//! and aggregates the measurements into per-label statistics.
//!
//! The core functionality includes:
//! - [`Profiler`] - Opens and closes regions and owns the per-label statistics
//! - [`RegionGuard`] - Keeps a region open for the lifetime of a lexical scope
//! - [`Report`] - Snapshot of the statistics, hottest regions first
//! - [`global`] - A process-wide profiler with an explicit `init`/`shutdown` lifecycle
//!
//! # Simple usage
//!
//! ```
//! use region_timer::Profiler;
//!
//! let profiler = Profiler::new();
//!
//! for batch in 0..8 {
//!     profiler.start("tensor_copy");
//!     // Copy the batch to the device.
//!     profiler.stop();
//!
//!     profiler.measure("forward", || {
//!         // Forward pass.
//!     });
//!
//!     // Closed on every path out of the loop body, including `break`.
//!     let _optimizer = profiler.region("optimizer");
//!
//!     if batch == 3 {
//!         break;
//!     }
//! }
//!
//! // Prints a table with one row per label: count, total, mean, min, max, std dev, self.
//! profiler.report().print_to_stdout();
//! ```
//!
//! # Nesting
//!
//! Regions nest per thread: [`Profiler::stop()`] always closes the innermost region opened
//! on the calling thread. Durations are inclusive - a region's time contains the time of
//! the regions nested inside it. The exclusive ("self") time of each label is tracked as
//! well, see [`RegionStats::self_total()`].
//!
//! # Threading
//!
//! A [`Profiler`] is a cheap, cloneable handle that can be sent to other threads. Each
//! thread gets its own nesting stack, so starting and stopping regions takes no locks.
//! Completed regions from all threads are aggregated into the same statistics.
//!
//! # Misuse
//!
//! Profiling never changes the behavior of the instrumented code. A [`Profiler::stop()`]
//! without an open region and a thread exiting with regions still open are logged as
//! warnings through [`tracing`](https://docs.rs/tracing) and counted in the [`Report`],
//! nothing more. Use [`Profiler::try_stop()`] to receive the [`Error`] directly.
//!
//! This crate never installs a `tracing` subscriber; install one in your application to
//! see the warnings.

mod builder;
mod clock;
mod constants;
mod error;
pub mod global;
mod guard;
mod label;
mod pal;
mod profiler;
mod record;
mod region_stack;
mod report;
mod store;

pub use builder::ProfilerBuilder;
pub(crate) use constants::ERR_POISONED_LOCK;
pub use error::Error;
pub(crate) use error::Result;
pub use global::{region, report, reset, start, stop};
pub use guard::RegionGuard;
pub use label::{Label, UNLABELED};
pub use profiler::Profiler;
pub use region_stack::CompletedRegion;
pub use report::{RegionStats, Report};
