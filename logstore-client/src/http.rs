//! Contains a client implementation using HTTP to interact with the log storage service.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::Response;
use serde::Serialize;

use crate::{Error, LogClient, LogEvent, Position, QueryRequest, QueryResult, Result, WriteResult};

/// User agent string used for outgoing requests.
pub const USER_AGENT: &str = concat!("logstore-client/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct WriteBody<'a> {
    tags: &'a str,
    fields: &'a str,
    events: &'a [LogEvent],
}

#[derive(Debug, Serialize)]
struct QueryBody<'a> {
    query: String,
    position: &'a Position,
    limit: usize,
}

/// A connection to the log storage service over HTTP.
///
/// Events are posted to `{service_url}/v1/write`, queries go to `{service_url}/v1/query`. Both
/// exchange JSON bodies.
#[derive(Debug)]
pub struct HttpClient {
    http: reqwest::Client,
    service_url: Arc<str>,
    closed: AtomicBool,
}

impl HttpClient {
    /// Creates a client for the service at `service_url`.
    pub fn new(service_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            service_url: service_url.trim_end_matches('/').into(),
            closed: AtomicBool::new(false),
        })
    }

    fn endpoint(&self, path: &str) -> Result<String> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        Ok(format!("{}/v1/{path}", self.service_url))
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(Error::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait::async_trait]
impl LogClient for HttpClient {
    async fn write(&self, tags: &str, fields: &str, events: &[LogEvent]) -> Result<WriteResult> {
        let url = self.endpoint("write")?;
        let body = WriteBody {
            tags,
            fields,
            events,
        };

        let response = self.http.post(url).json(&body).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
        let url = self.endpoint("query")?;
        let body = QueryBody {
            query: request.lql(),
            position: &request.position,
            limit: request.limit,
        };

        let response = self.http.post(url).json(&body).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        tracing::debug!(service_url = %self.service_url, "closed connection");
        Ok(())
    }
}
