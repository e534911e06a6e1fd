//! A throughput benchmark for log storage services.
//!
//! The benchmark runs two phases against a pool of client connections. In the write phase, every
//! client runs a number of workers that each write synthetic records into their own stream. Once
//! all writers are done, the read phase streams the same records back, with every reader
//! cancelling its stream as soon as it has seen enough events.
//!
//! For each phase, the total volume, the wall-clock duration and the resulting throughput are
//! reported. See [`Benchmark`] for the orchestration and [`Settings`] for the tunables.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use yansi::Paint;

pub mod bench;
pub mod config;
pub mod error;
pub mod identity;
pub mod observability;
pub mod reader;
pub mod records;
pub mod report;
pub mod writer;

pub use crate::bench::{Benchmark, BenchmarkResult, Workload};
pub use crate::config::{Accounting, Args, Settings};
pub use crate::report::{Phase, PhaseResult};

/// Runs both phases of `benchmark`, printing each phase summary as soon as it completes.
pub async fn run(benchmark: &Benchmark) -> Result<BenchmarkResult> {
    let workload = benchmark.workload();
    println!(
        "{} ({} workers, {} records of {} bytes each)",
        "## devbench".bold(),
        benchmark.worker_count().bold(),
        workload.record_count.bold(),
        workload.record_size.bold(),
    );

    let write = with_spinner("Writing records:", benchmark.write_phase()).await?;
    write.print();

    let read = with_spinner("Reading records:", benchmark.read_phase()).await?;
    read.print();

    Ok(BenchmarkResult { write, read })
}

async fn with_spinner<F: Future>(message: &'static str, future: F) -> Result<F::Output> {
    let bar = ProgressBar::new_spinner()
        .with_style(ProgressStyle::with_template("{spinner} {msg} {elapsed}")?)
        .with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    let output = future.await;
    bar.finish_and_clear();

    Ok(output)
}
