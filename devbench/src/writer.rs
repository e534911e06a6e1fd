use std::time::Instant;

use logstore_client::BoxedClient;

use crate::error::WorkerError;
use crate::identity::StreamId;
use crate::records::RecordFactory;
use crate::report::WorkerReport;

/// Writes a target number of records into one stream through one client.
#[derive(Debug)]
pub struct WriteWorker {
    client: BoxedClient,
    stream: StreamId,
    factory: RecordFactory,
    target_count: u64,
    progress_interval: u64,
}

impl WriteWorker {
    /// Creates a worker writing `target_count` records of `record_size` bytes into `stream`.
    pub fn new(
        client: BoxedClient,
        stream: StreamId,
        record_size: usize,
        target_count: u64,
    ) -> Self {
        Self {
            client,
            stream,
            factory: RecordFactory::new(record_size),
            target_count,
            progress_interval: 0,
        }
    }

    /// Sets the number of records per batch.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.factory = self.factory.batch_size(batch_size);
        self
    }

    /// Logs progress every `interval` records. Zero disables progress logs.
    pub fn progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Writes whole batches until at least `target_count` records have been sent.
    ///
    /// The first failed write stops this worker. The error ends up in the returned report.
    pub async fn run(mut self) -> WorkerReport {
        let mut report = WorkerReport::new(self.stream.clone());
        let mut batch = self.factory.make_batch();
        let mut written: u64 = 0;

        while written < self.target_count {
            let start = Instant::now();
            let result = match self.client.write(self.stream.as_str(), "", &batch).await {
                Ok(result) => result,
                Err(err) => {
                    tracing::error!(
                        error = &err as &dyn std::error::Error,
                        stream = %self.stream,
                        written,
                        "failed to write records"
                    );
                    report.error = Some(WorkerError::Write(err));
                    break;
                }
            };
            report.latency.add(start.elapsed().as_secs_f64());
            report.records += result.accepted;

            if self.progress_interval > 0 && written % self.progress_interval == 0 {
                tracing::info!(stream = %self.stream, written, "written records");
            }

            self.factory.refresh_timestamps(&mut batch);
            written += batch.len() as u64;
        }

        report
    }
}
