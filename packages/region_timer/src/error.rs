use thiserror::Error;

use crate::Label;

/// Misuse and initialization problems detected by the profiler.
///
/// None of these are ever raised into the instrumented code's control flow by
/// [`Profiler::stop()`][crate::Profiler::stop] or the region guards - they are logged and
/// counted instead. They are returned only from the explicitly fallible entry points such as
/// [`Profiler::try_stop()`][crate::Profiler::try_stop].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A region was stopped on a thread that has no open region.
    #[error("stop() called with no open region on this thread")]
    MismatchedRegion,

    /// A thread finished while a region it started was still open.
    #[error("region '{label}' at depth {depth} was never closed")]
    UnclosedRegion {
        /// Label passed to the `start` that was never matched.
        label: Label,

        /// Nesting depth of the region, 0 being the outermost.
        depth: usize,
    },

    /// The platform clock is not monotonic, so no measurement can be trusted.
    #[error("the platform does not provide a monotonic clock")]
    ClockUnavailable,
}

/// A specialized `Result` type for profiler operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
