//! Monotonic time source used to timestamp region boundaries.

use std::time::{Duration, Instant};

use crate::pal::{Platform, PlatformFacade};
use crate::{Error, Result};

/// How many consecutive readings the startup probe takes.
const PROBE_SAMPLES: usize = 8;

/// Captures monotonic timestamps for region boundaries.
///
/// Timestamps are opaque; the only supported arithmetic is [`Clock::elapsed()`].
#[derive(Clone, Debug)]
pub(crate) struct Clock {
    platform: PlatformFacade,
}

impl Clock {
    /// Creates a clock on top of the given platform, verifying that it is monotonic.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockUnavailable`] if consecutive readings go backwards.
    pub(crate) fn new(platform: PlatformFacade) -> Result<Self> {
        let clock = Self { platform };
        clock.probe()?;
        Ok(clock)
    }

    #[inline]
    pub(crate) fn now(&self) -> Instant {
        self.platform.now()
    }

    /// Duration from `start` to `end`, saturating to zero if `end` precedes `start`.
    #[inline]
    pub(crate) fn elapsed(start: Instant, end: Instant) -> Duration {
        end.saturating_duration_since(start)
    }

    fn probe(&self) -> Result<()> {
        let mut previous = self.now();

        for _ in 1..PROBE_SAMPLES {
            let current = self.now();

            if current < previous {
                return Err(Error::ClockUnavailable);
            }

            previous = current;
        }

        Ok(())
    }
}
