use std::time::Instant;

use crate::pal::Platform;

/// Reads the operating system's monotonic clock via [`Instant`].
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct RealPlatform;

impl Platform for RealPlatform {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}
