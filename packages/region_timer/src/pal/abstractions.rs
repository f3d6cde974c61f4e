//! Platform abstraction trait definitions.

use std::fmt::Debug;
use std::time::Instant;

/// Provides monotonic timestamps.
///
/// Implementations must never go backwards and must not follow wall clock adjustments.
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// Gets the current monotonic timestamp.
    fn now(&self) -> Instant;
}
