use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A single record of a log stream.
///
/// The message is kept as [`Bytes`], so many events can share one payload buffer without copying
/// it. On the wire the message is transported as a string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Nanoseconds since the Unix epoch.
    #[serde(rename = "ts")]
    pub timestamp: i64,
    /// The raw record payload.
    #[serde(rename = "msg", with = "message")]
    pub message: Bytes,
}

impl LogEvent {
    /// Creates a new event with the given timestamp and message.
    pub fn new(timestamp: i64, message: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }
}

/// The response returned from the service after a write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    /// The number of events the service accepted.
    pub accepted: u64,
}

mod message {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(message: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(message) {
            Ok(text) => serializer.serialize_str(text),
            Err(_) => serializer.serialize_str(&String::from_utf8_lossy(message)),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        String::deserialize(deserializer).map(Bytes::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_sent_as_text() {
        let event = LogEvent::new(42, "oh hai!");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json, serde_json::json!({"ts": 42, "msg": "oh hai!"}));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let event = LogEvent::new(1, vec![0x66, 0xff, 0x6f]);
        let json = serde_json::to_string(&event).unwrap();
        let decoded: LogEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.message, Bytes::from("f\u{fffd}o"));
    }
}
