//! Fans benchmark phases out across a client pool and measures them.

use std::sync::Arc;
use std::time::Instant;

use logstore_client::BoxedClient;
use tokio::task::JoinHandle;

use crate::config::Settings;
use crate::error::WorkerError;
use crate::identity::StreamId;
use crate::reader::ReadWorker;
use crate::report::{Phase, PhaseResult, WorkerReport};
use crate::writer::WriteWorker;

/// The shape of a benchmark run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Workload {
    /// Number of workers per client.
    pub threads_per_client: usize,
    /// Payload size of every record in bytes.
    pub record_size: usize,
    /// Number of records every worker writes, and reads back.
    pub record_count: u64,
}

/// Results of a full benchmark run.
#[derive(Debug)]
pub struct BenchmarkResult {
    /// The write phase.
    pub write: PhaseResult,
    /// The read phase, started after all writers finished.
    pub read: PhaseResult,
}

/// Everything a dispatcher needs to run the workers of one client.
#[derive(Debug)]
struct WorkAssignment {
    client: BoxedClient,
    client_index: usize,
    workload: Workload,
}

impl WorkAssignment {
    fn streams(&self) -> impl Iterator<Item = StreamId> + use<> {
        let client_index = self.client_index;
        let threads = self.workload.threads_per_client;
        (0..threads).map(move |thread| StreamId::new(client_index, thread, threads))
    }
}

/// Runs write and read phases against a pool of clients.
///
/// Every client gets its own dispatcher task, which spawns one worker task per thread. Workers
/// never share a client, a stream or a record batch, so they run without any coordination. A
/// phase ends when every worker has been joined.
#[derive(Debug)]
pub struct Benchmark {
    clients: Vec<BoxedClient>,
    workload: Workload,
    settings: Arc<Settings>,
}

impl Benchmark {
    /// Creates a benchmark over `clients`.
    pub fn new(clients: Vec<BoxedClient>, workload: Workload, settings: Settings) -> Self {
        Self {
            clients,
            workload,
            settings: Arc::new(settings),
        }
    }

    /// The configured workload.
    pub fn workload(&self) -> Workload {
        self.workload
    }

    /// The number of workers in each phase.
    pub fn worker_count(&self) -> usize {
        self.clients.len() * self.workload.threads_per_client
    }

    /// The configured number of bytes moved by each phase.
    pub fn nominal_bytes(&self) -> u64 {
        self.workload
            .record_count
            .saturating_mul(self.workload.record_size as u64)
            .saturating_mul(self.worker_count() as u64)
    }

    /// Runs the write phase, then the read phase.
    pub async fn run(&self) -> BenchmarkResult {
        let write = self.write_phase().await;
        let read = self.read_phase().await;
        BenchmarkResult { write, read }
    }

    /// Writes `record_count` records per worker.
    pub async fn write_phase(&self) -> PhaseResult {
        self.run_phase(Phase::Write).await
    }

    /// Reads `record_count` records per worker from the head of its stream.
    pub async fn read_phase(&self) -> PhaseResult {
        self.run_phase(Phase::Read).await
    }

    /// Closes all clients of the pool. Failures are logged.
    pub async fn close(self) {
        for client in &self.clients {
            if let Err(err) = client.close().await {
                tracing::warn!(
                    error = &err as &dyn std::error::Error,
                    "failed to close client"
                );
            }
        }
    }

    async fn run_phase(&self, phase: Phase) -> PhaseResult {
        tracing::debug!(%phase, workers = self.worker_count(), "starting phase");
        let start = Instant::now();

        let dispatchers: Vec<_> = self
            .clients
            .iter()
            .enumerate()
            .map(|(client_index, client)| {
                let assignment = WorkAssignment {
                    client: Arc::clone(client),
                    client_index,
                    workload: self.workload,
                };
                let streams: Vec<_> = assignment.streams().collect();
                let task = tokio::spawn(dispatch(phase, assignment, Arc::clone(&self.settings)));
                (streams, task)
            })
            .collect();

        let mut workers = Vec::with_capacity(self.worker_count());
        for (streams, result) in join_tasks(dispatchers).await {
            match result {
                Ok(reports) => workers.extend(reports),
                Err(err) => {
                    tracing::error!(error = %err, "dispatcher failed");
                    workers.extend(streams.into_iter().map(|stream| {
                        WorkerReport::failed(stream, WorkerError::Aborted(err.clone()))
                    }));
                }
            }
        }

        let elapsed = start.elapsed();
        tracing::debug!(%phase, ?elapsed, "finished phase");

        PhaseResult::new(
            phase,
            workers,
            elapsed,
            self.nominal_bytes(),
            self.workload.record_size as u64,
            self.settings.accounting,
        )
    }
}

/// Runs all workers of one client and collects their reports.
async fn dispatch(
    phase: Phase,
    assignment: WorkAssignment,
    settings: Arc<Settings>,
) -> Vec<WorkerReport> {
    let Workload {
        record_size,
        record_count,
        ..
    } = assignment.workload;

    let workers: Vec<_> = assignment
        .streams()
        .map(|stream| {
            let client = Arc::clone(&assignment.client);
            let task = match phase {
                Phase::Write => {
                    let worker = WriteWorker::new(client, stream.clone(), record_size, record_count)
                        .batch_size(settings.batch_size)
                        .progress_interval(settings.progress_interval);
                    tokio::spawn(worker.run())
                }
                Phase::Read => {
                    let worker = ReadWorker::new(client, stream.clone(), record_count)
                        .page_limit(settings.page_limit)
                        .poll_interval(settings.poll_interval)
                        .progress_interval(settings.progress_interval);
                    tokio::spawn(worker.run())
                }
            };
            (stream, task)
        })
        .collect();

    join_tasks(workers)
        .await
        .into_iter()
        .map(|(stream, result)| {
            result.unwrap_or_else(|err| {
                tracing::error!(error = %err, %stream, "worker failed");
                WorkerReport::failed(stream, WorkerError::Aborted(err))
            })
        })
        .collect()
}

/// Waits for every task, keeping each task's label next to its result.
///
/// Panics and aborts are turned into error messages so that one failed task never hides the
/// results of its siblings.
async fn join_tasks<L, T>(tasks: Vec<(L, JoinHandle<T>)>) -> Vec<(L, Result<T, String>)> {
    let (labels, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
    let results = futures::future::join_all(handles).await;

    labels
        .into_iter()
        .zip(results)
        .map(|(label, result)| (label, result.map_err(|err| err.to_string())))
        .collect()
}
