//! Turns paged queries into a cancelable stream of pages.

use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::{BoxedClient, QueryRequest, QueryResult, Result};

/// Default delay between polls for new events in [`SelectMode::Follow`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The type of [`Stream`](futures_util::Stream) returned by [`select`].
pub type PageStream = BoxStream<'static, Result<QueryResult>>;

/// How [`select`] behaves once it has caught up with the end of a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectMode {
    /// End the page stream at the first empty page.
    Once,
    /// Keep polling for new events until cancelled.
    Follow {
        /// Delay between polls while no new events are available.
        poll_interval: Duration,
    },
}

impl Default for SelectMode {
    fn default() -> Self {
        SelectMode::Follow {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Streams pages of events for `request`, starting at its position.
///
/// Each page advances the position for the next query. Cancelling `token` ends the stream: a
/// pending query or poll delay is abandoned and no further page is delivered. A query error is
/// yielded once and ends the stream.
pub fn select(
    client: BoxedClient,
    mut request: QueryRequest,
    mode: SelectMode,
    token: CancellationToken,
) -> PageStream {
    let pages = async_stream::stream! {
        loop {
            if token.is_cancelled() {
                break;
            }

            let result = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                result = client.query(&request) => result,
            };

            let page = match result {
                Ok(page) => page,
                Err(err) => {
                    yield Err(err);
                    break;
                }
            };
            request.position = page.next_position.clone();

            if !page.events.is_empty() {
                yield Ok(page);
                continue;
            }

            match mode {
                SelectMode::Once => break,
                SelectMode::Follow { poll_interval } => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(poll_interval) => {}
                    }
                }
            }
        }
    };

    pages.boxed()
}
