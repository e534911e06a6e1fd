//! Streaming reads with early termination.
//!
//! A [`ReadWorker`] follows one stream from its head and stops the stream as soon as it has seen
//! enough events. The bookkeeping lives in [`ReadBudget`], a small state machine:
//!
//! ```text
//! Idle -> Streaming -> Cancelling -> Terminated
//!                  \-> Exhausted  -> Terminated
//! ```
//!
//! The budget requests cancellation exactly once, the first time the remaining count drops to
//! zero or below.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use logstore_client::{BoxedClient, DEFAULT_PAGE_LIMIT, Position, QueryRequest, SelectMode, select};
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::identity::StreamId;
use crate::report::WorkerReport;

/// Lifecycle of a streaming read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadState {
    /// No page requested yet.
    Idle,
    /// Pages are being consumed.
    Streaming,
    /// The target was reached and the stream is being cancelled.
    Cancelling,
    /// The stream ended before the target was reached.
    Exhausted,
    /// The stream is closed.
    Terminated,
}

/// What the reader has to do after consuming a page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageOutcome {
    /// Keep reading.
    Continue,
    /// Stop the stream now.
    Cancel,
}

/// Counts consumed events against a target.
#[derive(Debug)]
pub struct ReadBudget {
    remaining: i64,
    consumed: u64,
    state: ReadState,
}

impl ReadBudget {
    /// Creates a budget for `target` events.
    pub fn new(target: u64) -> Self {
        Self {
            remaining: i64::try_from(target).unwrap_or(i64::MAX),
            consumed: 0,
            state: ReadState::Idle,
        }
    }

    /// Events still missing. Negative once the target has been overshot.
    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    /// Total events consumed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Current state.
    pub fn state(&self) -> ReadState {
        self.state
    }

    /// Marks the stream as opened.
    pub fn start(&mut self) {
        if self.state == ReadState::Idle {
            self.state = ReadState::Streaming;
        }
    }

    /// Accounts for a page of `events` events.
    ///
    /// Returns [`PageOutcome::Cancel`] on the transition into [`ReadState::Cancelling`] only;
    /// pages arriving afterwards are counted but never request cancellation again.
    pub fn consume(&mut self, events: usize) -> PageOutcome {
        self.consumed += events as u64;
        self.remaining = self.remaining.saturating_sub(events as i64);

        if self.state == ReadState::Streaming && self.remaining <= 0 {
            self.state = ReadState::Cancelling;
            return PageOutcome::Cancel;
        }
        PageOutcome::Continue
    }

    /// Marks the stream as ended. Returns the state it ended from.
    ///
    /// A stream that ends without having been cancelled is [`ReadState::Exhausted`].
    pub fn finish(&mut self) -> ReadState {
        if matches!(self.state, ReadState::Idle | ReadState::Streaming) {
            self.state = ReadState::Exhausted;
        }
        let ended = self.state;
        self.state = ReadState::Terminated;
        ended
    }
}

/// Returns `true` if a countdown from `before` to `after` reached or passed a multiple of
/// `interval`.
fn crossed_mark(before: i64, after: i64, interval: u64) -> bool {
    let Ok(interval) = i64::try_from(interval) else {
        return false;
    };
    interval > 0 && (before - 1).div_euclid(interval) != (after - 1).div_euclid(interval)
}

/// Streams a target number of events from one stream through one client.
#[derive(Debug)]
pub struct ReadWorker {
    client: BoxedClient,
    stream: StreamId,
    target_count: u64,
    page_limit: usize,
    mode: SelectMode,
    progress_interval: u64,
    token: CancellationToken,
}

impl ReadWorker {
    /// Creates a worker reading `target_count` events from the head of `stream`.
    pub fn new(client: BoxedClient, stream: StreamId, target_count: u64) -> Self {
        Self {
            client,
            stream,
            target_count,
            page_limit: DEFAULT_PAGE_LIMIT,
            mode: SelectMode::default(),
            progress_interval: 0,
            token: CancellationToken::new(),
        }
    }

    /// Sets the maximum number of events per page.
    pub fn page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    /// Sets the delay between polls while waiting for new events.
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.mode = SelectMode::Follow { poll_interval };
        self
    }

    /// Ends the read when the stream is exhausted, instead of waiting for more events.
    pub fn stop_at_tail(mut self) -> Self {
        self.mode = SelectMode::Once;
        self
    }

    /// Logs progress every `interval` events. Zero disables progress logs.
    pub fn progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Derives this worker's cancellation scope from `parent`.
    pub fn cancel_with(mut self, parent: &CancellationToken) -> Self {
        self.token = parent.child_token();
        self
    }

    /// Consumes pages until the target is reached, the stream ends, or a query fails.
    pub async fn run(self) -> WorkerReport {
        let mut report = WorkerReport::new(self.stream.clone());
        let mut budget = ReadBudget::new(self.target_count);

        let request = QueryRequest::new(self.stream.as_str())
            .position(Position::Head)
            .limit(self.page_limit);
        let mut pages = select(
            Arc::clone(&self.client),
            request,
            self.mode,
            self.token.clone(),
        );
        budget.start();

        let mut waiting_since = Instant::now();
        while let Some(page) = pages.next().await {
            let page = match page {
                Ok(page) => page,
                Err(err) => {
                    tracing::error!(
                        error = &err as &dyn std::error::Error,
                        stream = %self.stream,
                        consumed = budget.consumed(),
                        "failed to query records"
                    );
                    report.error = Some(WorkerError::Query(err));
                    break;
                }
            };
            report.latency.add(waiting_since.elapsed().as_secs_f64());

            let before = budget.remaining();
            let outcome = budget.consume(page.events.len());
            report.records += page.events.len() as u64;

            if crossed_mark(before, budget.remaining(), self.progress_interval) {
                tracing::info!(
                    stream = %self.stream,
                    remaining = budget.remaining(),
                    timestamp = page.events.last().map(|event| event.timestamp),
                    "read records"
                );
            }

            if outcome == PageOutcome::Cancel {
                self.token.cancel();
            }
            waiting_since = Instant::now();
        }

        let ended = budget.finish();
        tracing::debug!(
            stream = %self.stream,
            ?ended,
            consumed = budget.consumed(),
            "read finished"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use logstore_client::{InMemoryClient, LogClient, LogEvent};

    use super::*;

    #[test]
    fn budget_cancels_once() {
        let mut budget = ReadBudget::new(2500);
        assert_eq!(budget.state(), ReadState::Idle);

        budget.start();
        assert_eq!(budget.consume(1000), PageOutcome::Continue);
        assert_eq!(budget.consume(1000), PageOutcome::Continue);
        assert_eq!(budget.state(), ReadState::Streaming);

        assert_eq!(budget.consume(1000), PageOutcome::Cancel);
        assert_eq!(budget.state(), ReadState::Cancelling);
        assert_eq!(budget.remaining(), -500);

        // late pages are counted, but never cancel twice
        assert_eq!(budget.consume(1000), PageOutcome::Continue);
        assert_eq!(budget.consumed(), 4000);

        assert_eq!(budget.finish(), ReadState::Cancelling);
        assert_eq!(budget.state(), ReadState::Terminated);
    }

    #[test]
    fn budget_exhausts_without_cancel() {
        let mut budget = ReadBudget::new(100);
        budget.start();
        assert_eq!(budget.consume(40), PageOutcome::Continue);

        assert_eq!(budget.finish(), ReadState::Exhausted);
        assert_eq!(budget.state(), ReadState::Terminated);
    }

    #[test]
    fn progress_marks() {
        assert!(crossed_mark(1_000_000, 499_000, 500_000));
        assert!(crossed_mark(501_000, 500_000, 500_000));
        assert!(!crossed_mark(500_000, 499_000, 500_000));
        assert!(crossed_mark(1_000, 0, 500_000));
        assert!(!crossed_mark(1_000, 0, 0));
    }

    async fn store_with(stream: &StreamId, count: i64) -> InMemoryClient {
        let store = InMemoryClient::new();
        let events: Vec<_> = (0..count).map(|ts| LogEvent::new(ts, "x")).collect();
        store.write(stream.as_str(), "", &events).await.unwrap();
        store
    }

    #[tokio::test]
    async fn cancels_after_target() {
        let stream = StreamId::new(0, 0, 1);
        let store = store_with(&stream, 5000).await;

        let report = ReadWorker::new(Arc::new(store), stream, 2000)
            .page_limit(1000)
            .run()
            .await;

        assert!(report.error.is_none());
        assert_eq!(report.records, 2000);
        assert_eq!(report.latency.count(), 2);
    }

    #[tokio::test]
    async fn overshoots_by_at_most_one_page() {
        let stream = StreamId::new(0, 0, 1);
        let store = store_with(&stream, 5000).await;

        let report = ReadWorker::new(Arc::new(store), stream, 2500)
            .page_limit(1000)
            .run()
            .await;

        assert_eq!(report.records, 3000);
        assert!(report.records < 2500 + 1000);
    }

    #[tokio::test]
    async fn short_stream_is_exhausted_at_tail() {
        let stream = StreamId::new(0, 0, 1);
        let store = store_with(&stream, 1500).await;

        let report = ReadWorker::new(Arc::new(store), stream, 2000)
            .page_limit(1000)
            .stop_at_tail()
            .run()
            .await;

        assert!(report.error.is_none());
        assert_eq!(report.records, 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn parent_token_stops_a_waiting_reader() {
        let stream = StreamId::new(0, 0, 1);
        let parent = CancellationToken::new();

        let reader = ReadWorker::new(Arc::new(InMemoryClient::new()), stream, 10)
            .cancel_with(&parent)
            .run();
        let cancel = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            parent.cancel();
        };

        let (report, ()) = tokio::join!(reader, cancel);
        assert_eq!(report.records, 0);
    }

    #[tokio::test]
    async fn query_error_ends_the_worker() {
        let stream = StreamId::new(0, 0, 1);
        let client = InMemoryClient::new();
        client.close().await.unwrap();

        let report = ReadWorker::new(Arc::new(client), stream, 10).run().await;

        assert_eq!(report.records, 0);
        assert!(matches!(
            report.error,
            Some(WorkerError::Query(logstore_client::Error::Closed))
        ));
    }
}
