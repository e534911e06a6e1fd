//! Phase results and console output.

use std::fmt;
use std::time::Duration;

use bytesize::ByteSize;
use sketches_ddsketch::DDSketch;
use yansi::Paint;

use crate::config::Accounting;
use crate::error::WorkerError;
use crate::identity::StreamId;

/// Computes bytes per second, truncated to whole bytes.
///
/// Returns 0 if no time has elapsed.
pub fn throughput(total_bytes: u64, elapsed: Duration) -> u64 {
    let seconds = elapsed.as_secs_f64();
    if seconds <= 0.0 {
        return 0;
    }
    (total_bytes as f64 / seconds) as u64
}

/// One of the two timed parts of a benchmark run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Every worker writes its records.
    Write,
    /// Every worker streams its records back.
    Read,
}

impl Phase {
    fn past_tense(self) -> &'static str {
        match self {
            Phase::Write => "written",
            Phase::Read => "read",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Write => f.write_str("write"),
            Phase::Read => f.write_str("read"),
        }
    }
}

/// The outcome of a single worker.
pub struct WorkerReport {
    /// The stream the worker was assigned.
    pub stream: StreamId,
    /// Records the service accepted (writers) or delivered (readers).
    pub records: u64,
    /// The error that stopped the worker early, if any.
    pub error: Option<WorkerError>,
    /// Duration of each write call, or the wait for each page, in seconds.
    pub latency: DDSketch,
}

impl WorkerReport {
    /// Creates an empty report for `stream`.
    pub fn new(stream: StreamId) -> Self {
        Self {
            stream,
            records: 0,
            error: None,
            latency: DDSketch::default(),
        }
    }

    /// Creates a report for a worker that failed without moving any records.
    pub fn failed(stream: StreamId, error: WorkerError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(stream)
        }
    }
}

impl fmt::Debug for WorkerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerReport")
            .field("stream", &self.stream)
            .field("records", &self.records)
            .field("error", &self.error)
            .field("latency", &format_args!("[{} samples]", self.latency.count()))
            .finish()
    }
}

/// Aggregate result of a phase.
pub struct PhaseResult {
    /// Which phase was measured.
    pub phase: Phase,
    /// Bytes moved, according to the configured [`Accounting`].
    pub total_bytes: u64,
    /// Wall-clock duration from the first dispatch to the last join.
    pub elapsed: Duration,
    /// `total_bytes` per second.
    pub rate: u64,
    /// The reports of all workers.
    pub workers: Vec<WorkerReport>,
    /// Latencies of all workers combined.
    pub latency: DDSketch,
}

impl PhaseResult {
    /// Aggregates worker reports into a phase result.
    ///
    /// `nominal_bytes` is the configured volume of the phase, used with [`Accounting::Nominal`].
    pub fn new(
        phase: Phase,
        workers: Vec<WorkerReport>,
        elapsed: Duration,
        nominal_bytes: u64,
        record_size: u64,
        accounting: Accounting,
    ) -> Self {
        let total_bytes = match accounting {
            Accounting::Nominal => nominal_bytes,
            Accounting::Delivered => workers
                .iter()
                .map(|worker| worker.records.saturating_mul(record_size))
                .fold(0, u64::saturating_add),
        };

        let mut latency = DDSketch::default();
        for worker in &workers {
            if let Err(err) = latency.merge(&worker.latency) {
                tracing::warn!(error = ?err, "could not merge latencies");
            }
        }

        Self {
            phase,
            total_bytes,
            elapsed,
            rate: throughput(total_bytes, elapsed),
            workers,
            latency,
        }
    }

    /// Returns the number of workers that stopped because of an error.
    pub fn failures(&self) -> usize {
        self.workers
            .iter()
            .filter(|worker| worker.error.is_some())
            .count()
    }

    /// Prints the phase summary to stdout.
    pub fn print(&self) {
        println!(
            "{} were {} for {:.2?} which is {}/s",
            ByteSize::b(self.total_bytes).display().si().bold(),
            self.phase.past_tense(),
            self.elapsed,
            ByteSize::b(self.rate).display().si().bold().green(),
        );

        let failures = self.failures();
        if failures > 0 {
            println!(
                "  {}",
                format!("{failures} of {} WORKERS FAILED", self.workers.len())
                    .bold()
                    .red()
            );
        }

        if self.latency.count() > 0 {
            print_percentiles(&self.latency, Duration::from_secs_f64);
        }
    }
}

impl fmt::Debug for PhaseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseResult")
            .field("phase", &self.phase)
            .field("total_bytes", &self.total_bytes)
            .field("elapsed", &self.elapsed)
            .field("rate", &self.rate)
            .field("workers", &self.workers)
            .field("latency", &format_args!("[{} samples]", self.latency.count()))
            .finish()
    }
}

fn print_percentiles<T: fmt::Debug>(sketch: &DDSketch, map: impl Fn(f64) -> T) {
    let quantile = |q| sketch.quantile(q).ok().flatten().unwrap_or_default();

    let ops = sketch.count();
    let avg = map(sketch.sum().unwrap_or_default() / ops as f64);
    let p50 = map(quantile(0.5));
    let p90 = map(quantile(0.9));
    let p99 = map(quantile(0.99));
    println!(
        "  {} ops, avg: {:.2?}; p50: {p50:.2?}; p90: {p90:.2?}; p99: {p99:.2?}",
        ops.bold(),
        avg.bold()
    );
}

#[cfg(test)]
mod tests {
    use logstore_client::Error;

    use super::*;

    #[test]
    fn one_megabyte_in_one_second() {
        assert_eq!(throughput(1_000_000, Duration::from_secs(1)), 1_000_000);
        assert_eq!(throughput(1_000_000, Duration::from_millis(500)), 2_000_000);
        assert_eq!(throughput(300_000, Duration::from_secs(4)), 75_000);
    }

    #[test]
    fn zero_elapsed_has_zero_rate() {
        assert_eq!(throughput(1_000_000, Duration::ZERO), 0);
    }

    fn worker(number: usize, records: u64, error: Option<WorkerError>) -> WorkerReport {
        WorkerReport {
            records,
            error,
            ..WorkerReport::new(StreamId::new(0, number, 3))
        }
    }

    fn workers() -> Vec<WorkerReport> {
        vec![
            worker(0, 1000, None),
            worker(1, 400, Some(WorkerError::Write(Error::Closed))),
            worker(2, 1000, None),
        ]
    }

    #[test]
    fn nominal_accounting_ignores_failures() {
        let result = PhaseResult::new(
            Phase::Write,
            workers(),
            Duration::from_secs(2),
            150_000,
            50,
            Accounting::Nominal,
        );

        assert_eq!(result.total_bytes, 150_000);
        assert_eq!(result.rate, 75_000);
        assert_eq!(result.failures(), 1);
    }

    #[test]
    fn delivered_accounting_counts_records() {
        let result = PhaseResult::new(
            Phase::Read,
            workers(),
            Duration::from_secs(1),
            150_000,
            50,
            Accounting::Delivered,
        );

        assert_eq!(result.total_bytes, 2400 * 50);
        assert_eq!(result.rate, 120_000);
    }

    #[test]
    fn merges_worker_latencies() {
        let mut first = worker(0, 1, None);
        first.latency.add(0.1);
        let mut second = worker(1, 1, None);
        second.latency.add(0.2);
        second.latency.add(0.3);

        let result = PhaseResult::new(
            Phase::Write,
            vec![first, second],
            Duration::from_secs(1),
            0,
            1,
            Accounting::Nominal,
        );

        assert_eq!(result.latency.count(), 3);
    }
}
