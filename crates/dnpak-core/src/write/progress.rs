//! Rate-limited progress reporting for archive writes.

use std::time::{Duration, Instant};

/// How often the writer reports progress at most.
pub(crate) const REPORT_INTERVAL: Duration = Duration::from_millis(500);

/// Immutable snapshot handed to a [`ProgressSink`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteProgress {
    /// Files completely written so far.
    pub files_written: usize,
    /// Files the write pass will produce in total.
    pub total_files: usize,
    /// Source bytes consumed so far.
    pub bytes_written: u64,
    /// Source bytes the write pass will consume in total.
    pub total_bytes: u64,
    /// Completion rate since the previous report.
    pub files_per_second: f64,
    /// Throughput since the previous report.
    pub kilobytes_per_second: f64,
}

/// Observer for write progress, implemented for any
/// `FnMut(&WriteProgress)`.
///
/// The sink is observational only: it cannot pause, slow down, or abort
/// the write pass.
pub trait ProgressSink {
    /// Receives one rate-limited progress snapshot.
    fn on_progress(&mut self, progress: &WriteProgress);
}

impl<F: FnMut(&WriteProgress)> ProgressSink for F {
    fn on_progress(&mut self, progress: &WriteProgress) {
        self(progress);
    }
}

/// No-op sink for callers that do not track progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_progress(&mut self, _progress: &WriteProgress) {}
}

/// Wall-clock throttle computing instantaneous rates between reports.
///
/// Holds no global timer state; all cadence decisions come from elapsed
/// deltas against the creation instant and the last emission.
#[derive(Debug)]
pub(crate) struct ProgressThrottle {
    interval: Duration,
    started: Instant,
    last_report: Option<Instant>,
    last_files: usize,
    last_bytes: u64,
}

impl ProgressThrottle {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            started: Instant::now(),
            last_report: None,
            last_files: 0,
            last_bytes: 0,
        }
    }

    /// Emits a snapshot unless the previous one is younger than the
    /// interval. `force` bypasses the rate limit for the final report.
    pub(crate) fn report(
        &mut self,
        sink: &mut dyn ProgressSink,
        files_written: usize,
        total_files: usize,
        bytes_written: u64,
        total_bytes: u64,
        force: bool,
    ) {
        let now = Instant::now();
        let since_last = match self.last_report {
            Some(at) => now.duration_since(at),
            None => now.duration_since(self.started),
        };
        if !force && since_last < self.interval {
            return;
        }
        let elapsed = since_last.as_secs_f64().max(f64::EPSILON);
        let files_delta = files_written.saturating_sub(self.last_files);
        let bytes_delta = bytes_written.saturating_sub(self.last_bytes);
        let snapshot = WriteProgress {
            files_written,
            total_files,
            bytes_written,
            total_bytes,
            files_per_second: files_delta as f64 / elapsed,
            kilobytes_per_second: bytes_delta as f64 / 1024.0 / elapsed,
        };
        sink.on_progress(&snapshot);
        self.last_report = Some(now);
        self.last_files = files_written;
        self.last_bytes = bytes_written;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_interval_reports_every_call() {
        let mut snapshots: Vec<WriteProgress> = Vec::new();
        let mut sink = |progress: &WriteProgress| snapshots.push(*progress);
        let mut throttle = ProgressThrottle::new(Duration::ZERO);
        throttle.report(&mut sink, 1, 3, 100, 300, false);
        throttle.report(&mut sink, 2, 3, 200, 300, false);
        throttle.report(&mut sink, 3, 3, 300, 300, true);
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[2].files_written, 3);
        assert_eq!(snapshots[2].bytes_written, 300);
    }

    #[test]
    fn test_long_interval_suppresses_until_forced() {
        let count = std::cell::Cell::new(0usize);
        let mut sink = |_: &WriteProgress| count.set(count.get() + 1);
        let mut throttle = ProgressThrottle::new(Duration::from_secs(3600));
        throttle.report(&mut sink, 1, 2, 10, 20, false);
        throttle.report(&mut sink, 2, 2, 20, 20, false);
        assert_eq!(count.get(), 0);
        throttle.report(&mut sink, 2, 2, 20, 20, true);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_rates_are_finite_and_non_negative() {
        let mut seen: Option<WriteProgress> = None;
        let mut sink = |progress: &WriteProgress| seen = Some(*progress);
        let mut throttle = ProgressThrottle::new(Duration::ZERO);
        throttle.report(&mut sink, 5, 5, 5120, 5120, true);
        let progress = seen.unwrap();
        assert!(progress.files_per_second.is_finite());
        assert!(progress.kilobytes_per_second.is_finite());
        assert!(progress.files_per_second >= 0.0);
        assert!(progress.kilobytes_per_second >= 0.0);
    }

    #[test]
    fn test_deltas_reset_between_reports() {
        let mut snapshots: Vec<WriteProgress> = Vec::new();
        let mut sink = |progress: &WriteProgress| snapshots.push(*progress);
        let mut throttle = ProgressThrottle::new(Duration::ZERO);
        throttle.report(&mut sink, 1, 2, 1024, 2048, false);
        // Same cumulative totals: delta-derived rates must not go negative.
        throttle.report(&mut sink, 1, 2, 1024, 2048, true);
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].files_written, 1);
    }
}
