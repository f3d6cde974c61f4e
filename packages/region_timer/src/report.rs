//! Region timing reports.

use std::fmt;
use std::time::Duration;

use foldhash::{HashMap, HashMapExt};

use crate::Label;
use crate::record::AggregateRecord;
use crate::store::StoreSnapshot;

/// Snapshot of the per-label statistics of a [`Profiler`](crate::Profiler).
///
/// Rows are ordered by total time, descending, so the regions that consumed the most time
/// come first. Ties are broken by label.
///
/// For human-readable output, use the `Display` implementation, which renders an ASCII table.
/// For machine-readable output, inspect the rows via [`regions()`](Self::regions).
///
/// # Examples
///
/// ```
/// use region_timer::Profiler;
///
/// let profiler = Profiler::new();
///
/// for _ in 0..3 {
///     profiler.measure("forward", || std::hint::black_box(42));
/// }
///
/// let report = profiler.report();
///
/// for region in report.regions() {
///     println!(
///         "{}: {} times, {:?} total, {:?} mean",
///         region.label(),
///         region.count(),
///         region.total(),
///         region.mean()
///     );
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    regions: Box<[RegionStats]>,
    session: u64,
    mismatched_stops: u64,
    unclosed_regions: u64,
}

/// Statistics of one label in a [`Report`].
///
/// Every label in a report has been completed at least once.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionStats {
    label: Label,
    record: AggregateRecord,
    self_time_tracked: bool,
}

impl Report {
    pub(crate) fn from_snapshot(snapshot: StoreSnapshot, self_time_tracked: bool) -> Self {
        let regions = snapshot
            .records
            .into_iter()
            .filter(|(_, record)| record.count != 0)
            .map(|(label, record)| RegionStats {
                label,
                record,
                self_time_tracked,
            })
            .collect();

        Self::from_parts(
            regions,
            snapshot.session,
            snapshot.mismatched_stops,
            snapshot.unclosed_regions,
        )
    }

    /// A report with no regions in it.
    #[must_use]
    pub(crate) fn empty() -> Self {
        Self::from_parts(Vec::new(), 0, 0, 0)
    }

    fn from_parts(
        mut regions: Vec<RegionStats>,
        session: u64,
        mismatched_stops: u64,
        unclosed_regions: u64,
    ) -> Self {
        regions.sort_by(|a, b| {
            b.record
                .total
                .cmp(&a.record.total)
                .then_with(|| a.label.cmp(&b.label))
        });

        Self {
            regions: regions.into_boxed_slice(),
            session,
            mismatched_stops,
            unclosed_regions,
        }
    }

    /// Merges two reports into a new report.
    ///
    /// Labels present in both reports have their statistics combined as if all regions had
    /// been recorded by a single profiler. Misuse counters are added up and the session
    /// marker of the result is the higher of the two.
    ///
    /// # Examples
    ///
    /// ```
    /// use region_timer::{Profiler, Report};
    ///
    /// let a = Profiler::new();
    /// let b = Profiler::new();
    ///
    /// a.measure("forward", || ());
    /// b.measure("forward", || ());
    /// b.measure("backward", || ());
    ///
    /// let merged = Report::merge(&a.report(), &b.report());
    ///
    /// assert_eq!(merged.get("forward").unwrap().count(), 2);
    /// assert_eq!(merged.len(), 2);
    /// ```
    #[must_use]
    pub fn merge(a: &Self, b: &Self) -> Self {
        let mut merged: HashMap<Label, RegionStats> = HashMap::new();

        for region in a.regions.iter().chain(b.regions.iter()) {
            merged
                .entry(region.label.clone())
                .and_modify(|existing| {
                    existing.record.merge_from(&region.record);
                    existing.self_time_tracked &= region.self_time_tracked;
                })
                .or_insert_with(|| region.clone());
        }

        Self::from_parts(
            merged.into_values().collect(),
            a.session.max(b.session),
            a.mismatched_stops.saturating_add(b.mismatched_stops),
            a.unclosed_regions.saturating_add(b.unclosed_regions),
        )
    }

    /// Rows of the report, hottest first.
    pub fn regions(&self) -> impl Iterator<Item = &RegionStats> {
        self.regions.iter()
    }

    /// Statistics of one label, if it was recorded.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&RegionStats> {
        self.regions.iter().find(|region| region.label == label)
    }

    /// Number of distinct labels in the report.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether no region has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Session marker of the profiler at the time the report was taken.
    #[must_use]
    pub fn session(&self) -> u64 {
        self.session
    }

    /// How many times a stop found no open region to close.
    #[must_use]
    pub fn mismatched_stops(&self) -> u64 {
        self.mismatched_stops
    }

    /// How many regions were left open by exiting or finished threads.
    #[must_use]
    pub fn unclosed_regions(&self) -> u64 {
        self.unclosed_regions
    }

    /// Prints the report to stdout.
    ///
    /// Prints nothing if no regions were recorded. This may indicate that the program was
    /// only probed (e.g. a "list benchmarks" run), in which case printing anything might
    /// violate the output protocol the tool is speaking.
    #[cfg_attr(test, mutants::skip)] // Too difficult to test stdout output reliably - manually tested.
    pub fn print_to_stdout(&self) {
        if self.is_empty() {
            return;
        }

        println!("{self}");
    }
}

impl RegionStats {
    /// The region label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of completed regions with this label.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.record.count
    }

    /// Sum of the durations of all completed regions with this label.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.record.total
    }

    /// Mean duration (`total / count`).
    #[must_use]
    pub fn mean(&self) -> Duration {
        self.record.mean().unwrap_or_default()
    }

    /// Shortest duration.
    #[must_use]
    pub fn min(&self) -> Duration {
        self.record.min().unwrap_or_default()
    }

    /// Longest duration.
    #[must_use]
    pub fn max(&self) -> Duration {
        self.record.max().unwrap_or_default()
    }

    /// Population standard deviation of the durations.
    #[must_use]
    pub fn std_dev(&self) -> Duration {
        self.record.std_dev().unwrap_or_default()
    }

    /// Sum of the exclusive durations, i.e. excluding time spent in directly nested regions.
    ///
    /// `None` if the profiler was configured not to track self time.
    #[must_use]
    pub fn self_total(&self) -> Option<Duration> {
        self.self_time_tracked.then_some(self.record.self_total)
    }
}

const HEADERS: [&str; 7] = ["region", "count", "total", "mean", "min", "max", "std dev"];
const SELF_HEADER: &str = "self";

fn format_duration(duration: Duration) -> String {
    format!("{duration:.3?}")
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            writeln!(f, "No regions recorded.")?;
        } else {
            let show_self = self.regions.iter().all(|region| region.self_time_tracked);

            let rows = self
                .regions
                .iter()
                .map(|region| {
                    let mut cells = vec![
                        region.label().to_string(),
                        region.count().to_string(),
                        format_duration(region.total()),
                        format_duration(region.mean()),
                        format_duration(region.min()),
                        format_duration(region.max()),
                        format_duration(region.std_dev()),
                    ];

                    if show_self {
                        if let Some(self_total) = region.self_total() {
                            cells.push(format_duration(self_total));
                        }
                    }

                    cells
                })
                .collect::<Vec<_>>();

            let mut headers = HEADERS.to_vec();
            if show_self {
                headers.push(SELF_HEADER);
            }

            // We measure every cell to know how much padding each column needs.
            let widths = headers
                .iter()
                .enumerate()
                .map(|(column, header)| {
                    rows.iter()
                        .filter_map(|row| row.get(column))
                        .map(String::len)
                        .chain([header.len()])
                        .max()
                        .unwrap_or_default()
                })
                .collect::<Vec<_>>();

            write_row(f, headers.iter().copied(), &widths)?;
            for row in &rows {
                write_row(f, row.iter().map(String::as_str), &widths)?;
            }
        }

        if self.mismatched_stops != 0 {
            writeln!(f, "{} stop(s) without an open region", self.mismatched_stops)?;
        }

        if self.unclosed_regions != 0 {
            writeln!(f, "{} region(s) never closed", self.unclosed_regions)?;
        }

        Ok(())
    }
}

/// Label column is left-aligned, numeric columns right-aligned.
fn write_row<'a>(
    f: &mut fmt::Formatter<'_>,
    cells: impl Iterator<Item = &'a str>,
    widths: &[usize],
) -> fmt::Result {
    for (column, (cell, &width)) in cells.zip(widths).enumerate() {
        if column == 0 {
            write!(f, "{cell:<width$}")?;
        } else {
            write!(f, "  {cell:>width$}")?;
        }
    }

    writeln!(f)
}

impl Default for Report {
    fn default() -> Self {
        Self::empty()
    }
}
