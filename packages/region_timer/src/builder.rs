//! Profiler configuration.

use crate::pal::PlatformFacade;
use crate::{Profiler, Result};

/// Settings shared by every handle of one profiler.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ProfilerConfig {
    pub(crate) enabled: bool,
    pub(crate) track_self_time: bool,
    pub(crate) log_misuse: bool,
}

/// Creates a [`Profiler`] with non-default settings.
///
/// # Examples
///
/// ```
/// use region_timer::Profiler;
///
/// let profiler = Profiler::builder()
///     .track_self_time(false)
///     .log_misuse(false)
///     .build()
///     .expect("this platform has a monotonic clock");
///
/// profiler.measure("forward", || {
///     // Work to be measured.
/// });
/// ```
#[derive(Debug)]
#[must_use]
pub struct ProfilerBuilder {
    config: ProfilerConfig,
    platform: PlatformFacade,
}

impl ProfilerBuilder {
    pub(crate) fn new() -> Self {
        Self {
            config: ProfilerConfig {
                enabled: true,
                track_self_time: true,
                log_misuse: true,
            },
            platform: PlatformFacade::real(),
        }
    }

    /// Whether regions are measured at all. Defaults to `true`.
    ///
    /// A disabled profiler accepts every call but measures nothing and always produces
    /// an empty report, so instrumentation can stay in place when profiling is not wanted.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Whether to accumulate exclusive ("self") time per label. Defaults to `true`.
    ///
    /// Self time is the duration of a region minus the durations of the regions nested
    /// directly inside it.
    pub fn track_self_time(mut self, track_self_time: bool) -> Self {
        self.config.track_self_time = track_self_time;
        self
    }

    /// Whether misuse (mismatched stops, unclosed regions, empty labels) is logged as a
    /// `tracing` warning. Defaults to `true`.
    ///
    /// Misuse is counted in the report regardless of this setting.
    pub fn log_misuse(mut self, log_misuse: bool) -> Self {
        self.config.log_misuse = log_misuse;
        self
    }

    #[cfg(test)]
    pub(crate) fn platform(mut self, platform: PlatformFacade) -> Self {
        self.platform = platform;
        self
    }

    /// Creates the profiler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockUnavailable`][crate::Error::ClockUnavailable] if the platform
    /// clock is found not to be monotonic.
    pub fn build(self) -> Result<Profiler> {
        Profiler::from_parts(self.config, self.platform)
    }
}
