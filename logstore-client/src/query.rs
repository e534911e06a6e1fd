use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::LogEvent;

/// Default number of events the service returns per page.
pub const DEFAULT_PAGE_LIMIT: usize = 1000;

/// Where in a stream a query starts reading.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Position {
    /// The oldest event in the stream.
    #[default]
    Head,
    /// Just after the newest event in the stream.
    Tail,
    /// An absolute event offset, as returned by a previous page.
    Offset(u64),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Head => f.write_str("head"),
            Position::Tail => f.write_str("tail"),
            Position::Offset(offset) => write!(f, "{offset}"),
        }
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "head" => Ok(Position::Head),
            "tail" => Ok(Position::Tail),
            other => other
                .parse()
                .map(Position::Offset)
                .map_err(|_| format!("invalid stream position `{other}`")),
        }
    }
}

impl TryFrom<String> for Position {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Position> for String {
    fn from(position: Position) -> Self {
        position.to_string()
    }
}

/// A query selecting one page of events from a single stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryRequest {
    /// The tags identifying the stream.
    pub from: String,
    /// The position to start reading from.
    pub position: Position,
    /// The maximum number of events per page.
    pub limit: usize,
}

impl QueryRequest {
    /// Creates a request reading from the head of the stream identified by `from`.
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            position: Position::Head,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }

    /// Sets the position to start reading from.
    pub fn position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Sets the page limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Renders the request as a query string understood by the service.
    pub fn lql(&self) -> String {
        format!(
            "select from {} position {} limit {}",
            self.from, self.position, self.limit
        )
    }
}

/// One page of events returned by a query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    /// The events of this page, oldest first.
    pub events: Vec<LogEvent>,
    /// The position to continue reading from.
    pub next_position: Position,
}
