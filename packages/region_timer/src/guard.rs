//! Scoped regions.

use std::marker::PhantomData;

use crate::Profiler;

/// Keeps a region open until dropped.
///
/// Created by [`Profiler::region()`] or [`region()`][crate::region]. Dropping the guard
/// closes the region on every exit path, so regions opened through a guard can never be
/// left unclosed by an early `return` or `break`.
///
/// The guard is bound to the thread that created it because regions are nested per thread.
///
/// # Examples
///
/// ```
/// use region_timer::Profiler;
///
/// let profiler = Profiler::new();
///
/// {
///     let _forward = profiler.region("forward");
///     // Forward pass.
/// } // The region is closed and recorded here.
///
/// assert_eq!(profiler.report().get("forward").unwrap().count(), 1);
/// ```
#[derive(Debug)]
#[must_use = "the region is closed as soon as the guard is dropped"]
pub struct RegionGuard {
    // None if no region was opened (disabled or missing profiler).
    open: Option<(Profiler, usize)>,

    _single_threaded: PhantomData<*const ()>,
}

impl RegionGuard {
    pub(crate) fn new(profiler: Profiler, depth: Option<usize>) -> Self {
        Self {
            open: depth.map(|depth| (profiler, depth)),
            _single_threaded: PhantomData,
        }
    }

    /// A guard that closes nothing.
    pub(crate) fn inert() -> Self {
        Self {
            open: None,
            _single_threaded: PhantomData,
        }
    }
}

impl Drop for RegionGuard {
    fn drop(&mut self) {
        let Some((profiler, depth)) = self.open.take() else {
            return;
        };

        // Mixing guards with manual start()/stop() can make the innermost region belong to
        // someone else. We still close it to keep the stack balanced but make noise about it.
        match profiler.try_stop() {
            Ok(region) if region.depth() != depth => {
                tracing::warn!(
                    expected_depth = depth,
                    closed_label = region.label(),
                    closed_depth = region.depth(),
                    "region guard closed a region it did not open"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(expected_depth = depth, "region guard could not close its region: {e}");
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::Duration;

    use static_assertions::assert_not_impl_any;

    use super::*;
    use crate::pal::{FakePlatform, PlatformFacade};

    fn create_test_profiler() -> (Profiler, FakePlatform) {
        let platform = FakePlatform::new();

        let profiler = Profiler::builder()
            .platform(PlatformFacade::fake(platform.clone()))
            .build()
            .unwrap();

        (profiler, platform)
    }

    #[test]
    fn guard_records_on_drop() {
        let (profiler, platform) = create_test_profiler();

        {
            let _guard = profiler.region("optimizer");
            platform.advance(Duration::from_millis(12));
            assert_eq!(profiler.open_regions(), 1);
        }

        assert_eq!(profiler.open_regions(), 0);
        assert_eq!(
            profiler.report().get("optimizer").unwrap().total(),
            Duration::from_millis(12)
        );
    }

    #[test]
    fn nested_guards_close_in_reverse_order() {
        let (profiler, platform) = create_test_profiler();

        {
            let _outer = profiler.region("outer");
            platform.advance(Duration::from_millis(1));
            {
                let _inner = profiler.region("inner");
                platform.advance(Duration::from_millis(2));
            }
            platform.advance(Duration::from_millis(1));
        }

        let report = profiler.report();
        assert_eq!(report.get("outer").unwrap().total(), Duration::from_millis(4));
        assert_eq!(report.get("inner").unwrap().total(), Duration::from_millis(2));
    }

    #[test]
    fn guard_closes_on_early_return() {
        fn step(profiler: &Profiler, fail: bool) -> Result<(), &'static str> {
            let _guard = profiler.region("step");

            if fail {
                return Err("failed");
            }

            Ok(())
        }

        let (profiler, _platform) = create_test_profiler();

        step(&profiler, false).unwrap();
        step(&profiler, true).unwrap_err();

        assert_eq!(profiler.open_regions(), 0);
        assert_eq!(profiler.report().get("step").unwrap().count(), 2);
    }

    #[test]
    fn guard_tolerates_manual_stop_of_its_region() {
        let (profiler, _platform) = create_test_profiler();

        {
            let _guard = profiler.region("forward");
            profiler.stop();
        }

        let report = profiler.report();
        assert_eq!(report.get("forward").unwrap().count(), 1);
        assert_eq!(report.mismatched_stops(), 1);
    }

    #[test]
    fn inert_guard_does_nothing() {
        let (profiler, _platform) = create_test_profiler();

        drop(RegionGuard::inert());

        assert_eq!(profiler.report().mismatched_stops(), 0);
    }

    assert_not_impl_any!(RegionGuard: Send, Sync);
}
