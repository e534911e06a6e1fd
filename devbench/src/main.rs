//! Runs a write and a read benchmark against a log storage service.
//!
//! ```text
//! devbench <clients> <threads> <record size> <records>
//! ```
//!
//! Every client connection runs `threads` workers. Each worker writes `records` records of
//! `record size` bytes into its own stream, then the same number of records are streamed back.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

use std::process::ExitCode;

use anyhow::{Context, Result};
use devbench::observability::initialize_tracing;
use devbench::{Args, Benchmark, Settings, Workload};
use logstore_client::ClientBuilder;

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(exit_code) => return exit_code,
    };

    match execute(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn parse_args() -> Result<Args, ExitCode> {
    let strings: Vec<String> = std::env::args().collect();
    let command = strings.first().map_or("devbench", String::as_str);
    let rest: Vec<&str> = strings.iter().skip(1).map(String::as_str).collect();

    Args::parse(command, &rest).map_err(|exit| {
        println!("{}", exit.output.trim_end());
        match exit.status {
            Ok(()) => ExitCode::SUCCESS,
            Err(()) => ExitCode::FAILURE,
        }
    })
}

fn execute(args: Args) -> Result<()> {
    let settings = Settings::load(&args)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("devbench-rt")
        .enable_all()
        .build()?;
    let _runtime_guard = runtime.enter();

    initialize_tracing();
    tracing::debug!(?settings);

    let clients = ClientBuilder::new(&settings.remote)
        .and_then(|builder| {
            builder
                .timeout(settings.request_timeout)
                .build_pool(args.clients as usize)
        })
        .context("Could not create new client")?;

    let workload = Workload {
        threads_per_client: args.threads as usize,
        record_size: args.record_size as usize,
        record_count: u64::from(args.records),
    };
    let benchmark = Benchmark::new(clients, workload, settings);

    runtime.block_on(async move {
        let result = devbench::run(&benchmark).await;
        benchmark.close().await;
        result.map(drop)
    })
}
