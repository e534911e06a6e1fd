/// Errors that can happen within the logstore-client
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Any error emitted from the underlying [`reqwest`] client.
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    /// The service answered with a non-successful status code.
    #[error("request failed with status {status}: {message}")]
    Status {
        /// The HTTP status code returned by the service.
        status: u16,
        /// The response body, if any.
        message: String,
    },
    /// Error when the remote URL cannot be used.
    #[error("invalid remote `{remote}`: {message}")]
    InvalidUrl {
        /// The remote as it was given.
        remote: String,
        /// The URL error message.
        message: String,
    },
    /// The client was used after [`close`](crate::LogClient::close).
    #[error("client is closed")]
    Closed,
}

/// A convenience alias that defaults our [`Error`] type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
