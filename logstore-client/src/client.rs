use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;

use crate::{
    Error, HttpClient, InMemoryClient, LogEvent, QueryRequest, QueryResult, Result, WriteResult,
};

/// The remote that selects the in-process store instead of a network service.
pub const MEMORY_REMOTE: &str = "memory:";

/// Default timeout for a single request against the service.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A connection to a log storage service.
#[async_trait::async_trait]
pub trait LogClient: Debug + Send + Sync + 'static {
    /// Appends `events` to the stream identified by `tags`.
    ///
    /// `fields` carries optional metadata attached to the written events.
    async fn write(&self, tags: &str, fields: &str, events: &[LogEvent]) -> Result<WriteResult>;

    /// Fetches a single page of events.
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult>;

    /// Releases the connection. Any further call returns [`Error::Closed`].
    async fn close(&self) -> Result<()>;
}

/// A type-erased [`LogClient`] instance, shareable across tasks.
pub type BoxedClient = Arc<dyn LogClient>;

#[derive(Debug)]
enum Remote {
    Http(Url),
    Memory(InMemoryClient),
}

/// Constructs [`LogClient`]s for a single remote.
///
/// The remote is either an `http://` or `https://` URL, or [`MEMORY_REMOTE`]. All clients built
/// for the in-memory remote share one store, so they behave like separate connections to the
/// same service.
#[derive(Debug)]
pub struct ClientBuilder {
    remote: Remote,
    timeout: Duration,
}

impl ClientBuilder {
    /// Creates a new [`ClientBuilder`] targeting the given `remote`.
    pub fn new(remote: &str) -> Result<Self> {
        let remote = if remote == MEMORY_REMOTE {
            Remote::Memory(InMemoryClient::new())
        } else {
            let url = Url::parse(remote).map_err(|err| Error::InvalidUrl {
                remote: remote.to_owned(),
                message: err.to_string(),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::InvalidUrl {
                    remote: remote.to_owned(),
                    message: format!("unsupported scheme `{}`", url.scheme()),
                });
            }
            Remote::Http(url)
        };

        Ok(Self {
            remote,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Creates a builder handing out connections to an existing in-memory store.
    pub fn in_memory(store: &InMemoryClient) -> Self {
        Self {
            remote: Remote::Memory(store.connect()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the timeout for individual requests. Ignored by the in-memory store.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Creates a new, independent connection.
    pub fn build(&self) -> Result<BoxedClient> {
        let client: BoxedClient = match &self.remote {
            Remote::Http(url) => Arc::new(HttpClient::new(url.as_str(), self.timeout)?),
            Remote::Memory(store) => Arc::new(store.connect()),
        };
        Ok(client)
    }

    /// Creates `size` independent connections.
    pub fn build_pool(&self, size: usize) -> Result<Vec<BoxedClient>> {
        (0..size).map(|_| self.build()).collect()
    }
}
