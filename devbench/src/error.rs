//! Failures of individual benchmark workers.

use thiserror::Error;

/// Why a worker stopped before reaching its target.
///
/// Worker errors never abort a phase. They are collected in the worker's
/// [`WorkerReport`](crate::report::WorkerReport) and reported alongside the phase totals.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Writing a batch of records failed.
    #[error("write failed: {0}")]
    Write(#[source] logstore_client::Error),

    /// Fetching a page of the streaming query failed.
    #[error("query failed: {0}")]
    Query(#[source] logstore_client::Error),

    /// The worker task panicked or was aborted.
    #[error("worker task failed: {0}")]
    Aborted(String),
}
