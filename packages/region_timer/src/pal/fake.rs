//! Fake platform implementation for testing.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::pal::abstractions::Platform;

/// Offset of the fake clock when a `FakePlatform` is created.
///
/// Non-zero so that tests can simulate a clock that runs backwards.
const INITIAL_OFFSET: Duration = Duration::from_secs(3600);

/// Internal state for the fake platform that can be shared between clones.
#[derive(Debug)]
struct FakePlatformState {
    base: Instant,
    offset: Duration,

    // Applied after every read; simulates a broken clock.
    backwards_step: Option<Duration>,
}

/// Fake implementation of the platform abstraction for testing.
///
/// Multiple clones of the same `FakePlatform` share the same underlying time state, allowing
/// tests to move time forward after handing the platform to a profiler.
#[derive(Clone, Debug)]
pub(crate) struct FakePlatform {
    state: Arc<Mutex<FakePlatformState>>,
}

impl FakePlatform {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakePlatformState {
                base: Instant::now(),
                offset: INITIAL_OFFSET,
                backwards_step: None,
            })),
        }
    }

    /// Moves the fake clock forward.
    ///
    /// This affects all clones of this platform.
    pub(crate) fn advance(&self, duration: Duration) {
        let mut state = self
            .state
            .lock()
            .expect("FakePlatform state lock should not be poisoned");

        state.offset = state
            .offset
            .checked_add(duration)
            .expect("fake clock advanced unrealistically far");
    }

    /// Makes every subsequent read move the clock backwards by `step`.
    pub(crate) fn run_backwards(&self, step: Duration) {
        self.state
            .lock()
            .expect("FakePlatform state lock should not be poisoned")
            .backwards_step = Some(step);
    }
}

impl Platform for FakePlatform {
    fn now(&self) -> Instant {
        let mut state = self
            .state
            .lock()
            .expect("FakePlatform state lock should not be poisoned");

        let now = state
            .base
            .checked_add(state.offset)
            .expect("fake clock offset is always representable");

        if let Some(step) = state.backwards_step {
            state.offset = state.offset.saturating_sub(step);
        }

        now
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn time_stands_still_until_advanced() {
        let platform = FakePlatform::new();

        let a = platform.now();
        let b = platform.now();

        assert_eq!(a, b);
    }

    #[test]
    fn advance_moves_time_forward() {
        let platform = FakePlatform::new();

        let a = platform.now();
        platform.advance(Duration::from_millis(150));
        let b = platform.now();

        assert_eq!(b.duration_since(a), Duration::from_millis(150));
    }

    #[test]
    fn shared_state_between_clones() {
        let platform1 = FakePlatform::new();
        let platform2 = platform1.clone();

        let before = platform2.now();
        platform1.advance(Duration::from_millis(100));

        assert_eq!(
            platform2.now().duration_since(before),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn run_backwards_makes_reads_decrease() {
        let platform = FakePlatform::new();
        platform.run_backwards(Duration::from_millis(1));

        let a = platform.now();
        let b = platform.now();

        assert!(b < a);
    }
}
