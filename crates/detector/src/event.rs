use crate::frame::CallFrame;
use crate::mapping::TopicId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Context key carrying an explicit topic override.
pub const TOPIC_OVERRIDE_KEY: &str = "topic_id";
/// Context key carrying a bot token override.
pub const TOKEN_OVERRIDE_KEY: &str = "token";
/// Context key carrying a destination override.
pub const CHAT_OVERRIDE_KEY: &str = "chat_id";

/// Syslog severities, lowest first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Notice => "NOTICE",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Alert => "ALERT",
            Level::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error attached to a log event, with the call history captured where it
/// was raised (most recent frame first).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    #[serde(default)]
    pub class: Option<String>,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub frames: Vec<CallFrame>,
}

/// Inbound log record. Read-only to the detector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub message: String,

    #[serde(default)]
    pub context: Map<String, Value>,

    #[serde(default)]
    pub level: Level,

    #[serde(default)]
    pub channel: String,

    /// Unix timestamp in milliseconds
    #[serde(default)]
    pub datetime_ms: u64,

    #[serde(default)]
    pub error: Option<ErrorRecord>,
}

impl LogEvent {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            ..Default::default()
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_error(mut self, error: ErrorRecord) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Explicit topic override, if the context carries a usable one.
    pub fn topic_override(&self) -> Option<TopicId> {
        self.context
            .get(TOPIC_OVERRIDE_KEY)
            .and_then(TopicId::from_json)
    }

    /// Call history of the attached error; empty when there is none.
    pub fn frames(&self) -> &[CallFrame] {
        self.error
            .as_ref()
            .map(|error| error.frames.as_slice())
            .unwrap_or(&[])
    }

    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn topic_override_accepts_int_and_string() {
        let event = LogEvent::new(Level::Info, "x").with_context("topic_id", 42);
        assert_eq!(event.topic_override(), Some(TopicId::Int(42)));

        let event = LogEvent::new(Level::Info, "x").with_context("topic_id", "ops");
        assert_eq!(event.topic_override(), Some(TopicId::from("ops")));
    }

    #[test]
    fn unusable_override_is_ignored() {
        let event = LogEvent::new(Level::Info, "x").with_context("topic_id", json!(null));
        assert_eq!(event.topic_override(), None);

        let event = LogEvent::new(Level::Info, "x").with_context("topic_id", json!([1]));
        assert_eq!(event.topic_override(), None);
    }

    #[test]
    fn deserializes_minimal_event() {
        let event: LogEvent = serde_json::from_value(json!({
            "message": "boom",
            "level": "critical"
        }))
        .unwrap();
        assert_eq!(event.level, Level::Critical);
        assert!(event.frames().is_empty());
        assert!(event.context.is_empty());
    }

    #[test]
    fn missing_level_defaults_to_debug() {
        let event: LogEvent = serde_json::from_value(json!({"message": "x"})).unwrap();
        assert_eq!(event.level, Level::Debug);
        assert_eq!(Level::default(), Level::Debug);
    }

    #[test]
    fn levels_are_ordered() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Alert < Level::Emergency);
        assert_eq!(Level::Warning.to_string(), "WARNING");
    }
}
