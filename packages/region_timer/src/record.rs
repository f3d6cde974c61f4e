use std::time::Duration;

/// Statistics accumulated for one label.
///
/// The min/max fields are only meaningful once `count` is non-zero, which is why they are
/// exposed through accessors returning `Option`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct AggregateRecord {
    pub(crate) count: u64,
    pub(crate) total: Duration,
    min: Duration,
    max: Duration,

    // Sum of squared durations, in nanoseconds squared.
    sum_of_squares: u128,

    // Inclusive time minus time spent in directly nested regions.
    pub(crate) self_total: Duration,
}

impl AggregateRecord {
    /// Adds one completed region to the statistics.
    ///
    /// Accumulation saturates instead of overflowing; a saturated record is still usable,
    /// just no longer exact.
    pub(crate) fn add(&mut self, duration: Duration, self_time: Duration) {
        if self.count == 0 {
            self.min = duration;
            self.max = duration;
        } else {
            self.min = self.min.min(duration);
            self.max = self.max.max(duration);
        }

        self.count = self.count.saturating_add(1);
        self.total = self.total.saturating_add(duration);
        self.self_total = self.self_total.saturating_add(self_time);

        let nanos = duration.as_nanos();
        self.sum_of_squares = self
            .sum_of_squares
            .saturating_add(nanos.saturating_mul(nanos));
    }

    /// Combines another record into this one, as if all its regions had been added here.
    pub(crate) fn merge_from(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }

        if self.count == 0 {
            self.min = other.min;
            self.max = other.max;
        } else {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }

        self.count = self.count.saturating_add(other.count);
        self.total = self.total.saturating_add(other.total);
        self.self_total = self.self_total.saturating_add(other.self_total);
        self.sum_of_squares = self.sum_of_squares.saturating_add(other.sum_of_squares);
    }

    pub(crate) fn min(&self) -> Option<Duration> {
        (self.count != 0).then_some(self.min)
    }

    pub(crate) fn max(&self) -> Option<Duration> {
        (self.count != 0).then_some(self.max)
    }

    pub(crate) fn mean(&self) -> Option<Duration> {
        let mean_nanos = self
            .total
            .as_nanos()
            .checked_div(u128::from(self.count))?;

        Some(Duration::from_nanos(
            u64::try_from(mean_nanos).unwrap_or(u64::MAX),
        ))
    }

    /// Population standard deviation of the recorded durations.
    ///
    /// The variance numerator `n * sum(x^2) - sum(x)^2` is computed exactly in integers, so
    /// long regions with a small spread do not lose their spread to cancellation.
    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "standard deviation is an estimate - sub-nanosecond precision is not required"
    )]
    pub(crate) fn std_dev(&self) -> Option<Duration> {
        if self.count == 0 {
            return None;
        }

        let count = u128::from(self.count);
        let total = self.total.as_nanos();

        let variance = match count
            .checked_mul(self.sum_of_squares)
            .zip(total.checked_mul(total))
        {
            // Non-negative unless an accumulator has saturated.
            Some((scaled_squares, squared_total)) => {
                let numerator = scaled_squares.saturating_sub(squared_total) as f64;
                let count = count as f64;
                numerator / count / count
            }
            // Astronomically long totals: fall back to floating point, accepting cancellation.
            None => {
                let count = count as f64;
                let mean = total as f64 / count;
                let mean_of_squares = self.sum_of_squares as f64 / count;
                (mean_of_squares - mean * mean).max(0.0)
            }
        };

        Some(Duration::from_nanos(variance.sqrt().round() as u64))
    }
}
