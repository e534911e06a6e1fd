//! In-memory log store.
//!
//! This provides a [`LogClient`] backed by a `HashMap` of streams, removing the need for a running
//! service in tests. Every connection obtained through [`InMemoryClient::connect`] shares the same
//! streams but can be closed independently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::{Error, LogClient, LogEvent, Position, QueryRequest, QueryResult, Result, WriteResult};

type Streams = HashMap<String, Vec<LogEvent>>;

/// A connection to an in-process log store.
#[derive(Debug, Default)]
pub struct InMemoryClient {
    streams: Arc<Mutex<Streams>>,
    closed: AtomicBool,
}

impl InMemoryClient {
    /// Creates an empty store and returns a connection to it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens another connection to the same store.
    pub fn connect(&self) -> Self {
        Self {
            streams: Arc::clone(&self.streams),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the number of events stored in the stream identified by `tags`.
    pub fn stream_len(&self, tags: &str) -> usize {
        self.streams
            .lock()
            .unwrap()
            .get(tags)
            .map_or(0, |events| events.len())
    }

    /// Returns the tags of all streams that received at least one event, sorted.
    pub fn stream_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.streams.lock().unwrap().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl LogClient for InMemoryClient {
    async fn write(&self, tags: &str, _fields: &str, events: &[LogEvent]) -> Result<WriteResult> {
        self.ensure_open()?;

        self.streams
            .lock()
            .unwrap()
            .entry(tags.to_owned())
            .or_default()
            .extend_from_slice(events);

        Ok(WriteResult {
            accepted: events.len() as u64,
        })
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
        self.ensure_open()?;

        let streams = self.streams.lock().unwrap();
        let stored = streams.get(&request.from).map_or(&[][..], Vec::as_slice);

        let start = match request.position {
            Position::Head => 0,
            Position::Tail => stored.len(),
            Position::Offset(offset) => usize::try_from(offset).unwrap_or(usize::MAX),
        }
        .min(stored.len());
        let end = start.saturating_add(request.limit).min(stored.len());

        Ok(QueryResult {
            events: stored[start..end].to_vec(),
            next_position: Position::Offset(end as u64),
        })
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(range: std::ops::Range<i64>) -> Vec<LogEvent> {
        range.map(|ts| LogEvent::new(ts, "x")).collect()
    }

    #[tokio::test]
    async fn pages_through_a_stream() {
        let client = InMemoryClient::new();
        client.write("test=a", "", &events(0..25)).await.unwrap();

        let request = QueryRequest::new("test=a").limit(10);
        let first = client.query(&request).await.unwrap();
        assert_eq!(first.events.len(), 10);
        assert_eq!(first.next_position, Position::Offset(10));

        let request = request.position(Position::Offset(20));
        let last = client.query(&request).await.unwrap();
        assert_eq!(last.events, events(20..25));
        assert_eq!(last.next_position, Position::Offset(25));

        let request = QueryRequest::new("test=a").position(Position::Tail);
        let tail = client.query(&request).await.unwrap();
        assert!(tail.events.is_empty());
        assert_eq!(tail.next_position, Position::Offset(25));
    }

    #[tokio::test]
    async fn unknown_stream_is_empty() {
        let client = InMemoryClient::new();
        let page = client.query(&QueryRequest::new("test=nope")).await.unwrap();

        assert!(page.events.is_empty());
        assert_eq!(page.next_position, Position::Offset(0));
    }

    #[tokio::test]
    async fn closing_one_connection_keeps_others_open() {
        let first = InMemoryClient::new();
        let second = first.connect();

        first.close().await.unwrap();
        let err = first.write("test=a", "", &events(0..1)).await.unwrap_err();
        assert!(matches!(err, Error::Closed));

        second.write("test=a", "", &events(0..3)).await.unwrap();
        assert_eq!(first.stream_len("test=a"), 3);
        assert_eq!(second.stream_names(), vec!["test=a".to_owned()]);
    }
}
