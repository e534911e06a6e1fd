use std::fmt;

/// Tag prefix shared by all benchmark streams.
pub const STREAM_PREFIX: &str = "test=hello";

/// The stream a single worker writes to and reads from.
///
/// Identities are numbered `client_index * threads_per_client + thread_index`, so every
/// `(client, thread)` pair of a pool maps to its own stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(String);

impl StreamId {
    /// Derives the identity of thread `thread_index` on client `client_index`.
    pub fn new(client_index: usize, thread_index: usize, threads_per_client: usize) -> Self {
        debug_assert!(thread_index < threads_per_client);
        let number = client_index * threads_per_client + thread_index;
        Self(format!("{STREAM_PREFIX}{number}"))
    }

    /// Returns the tags of this stream.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
