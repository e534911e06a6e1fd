//! # Logstore Client
//!
//! The client is used to write records into, and stream records out of, a log storage service.
//! Every connection implements [`LogClient`], which is the only capability the benchmark harness
//! relies on. Two transports are provided:
//!
//! - [`HttpClient`] talks JSON over HTTP to a running service.
//! - [`InMemoryClient`] keeps all streams in process memory, which is useful for tests and for
//!   measuring the overhead of the harness itself.
//!
//! Paged queries can be turned into a cancelable stream of pages with [`select`].
//!
//! ## Usage
//!
//! ```no_run
//! use logstore_client::{ClientBuilder, LogEvent, QueryRequest};
//!
//! # async fn example() -> logstore_client::Result<()> {
//! let client = ClientBuilder::new("http://127.0.0.1:9966")?.build()?;
//!
//! let events = vec![LogEvent::new(1, "hello")];
//! client.write("app=demo", "", &events).await?;
//!
//! let page = client.query(&QueryRequest::new("app=demo")).await?;
//! assert_eq!(page.events.len(), 1);
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod client;
mod error;
mod event;
mod http;
mod memory;
mod query;
mod select;

pub use client::*;
pub use error::*;
pub use event::*;
pub use http::*;
pub use memory::*;
pub use query::*;
pub use select::*;
