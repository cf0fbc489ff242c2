use crate::error::{HandlerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use topic_detector::{Level, TopicId};

/// Public bot API host; endpoints under it get the token and action appended.
pub const PUBLIC_BOT_API: &str = "https://api.telegram.org";

/// Destination chat: a numeric id or a `@channel` name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Int(i64),
    Text(String),
}

impl ChatId {
    /// Integer or non-empty string; anything else is not a chat id.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(ChatId::Int),
            Value::String(s) if !s.trim().is_empty() => Some(ChatId::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatId::Int(id) => write!(f, "{id}"),
            ChatId::Text(name) => f.write_str(name),
        }
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        ChatId::Int(id)
    }
}

impl From<&str> for ChatId {
    fn from(name: &str) -> Self {
        ChatId::Text(name.to_string())
    }
}

fn default_bot_api() -> String {
    format!("{PUBLIC_BOT_API}/bot")
}

fn default_timeout() -> u64 {
    5
}

fn default_verify_ssl() -> bool {
    true
}

/// Configuration for the log handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Bot access token
    pub token: String,

    /// Default destination
    pub chat_id: ChatId,

    /// Topic used when none is detected
    #[serde(default)]
    pub topic_id: Option<TopicId>,

    /// Named queue; deliveries are synchronous when unset
    #[serde(default)]
    pub queue: Option<String>,

    #[serde(default = "default_bot_api")]
    pub bot_api: String,

    #[serde(default)]
    pub proxy: Option<String>,

    /// Request timeout in seconds (1..=300)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,

    /// Events below this level are ignored
    #[serde(default)]
    pub min_level: Level,
}

impl HandlerConfig {
    pub fn new(token: impl Into<String>, chat_id: impl Into<ChatId>) -> Self {
        Self {
            token: token.into(),
            chat_id: chat_id.into(),
            topic_id: None,
            queue: None,
            bot_api: default_bot_api(),
            proxy: None,
            timeout_secs: default_timeout(),
            verify_ssl: default_verify_ssl(),
            min_level: Level::default(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(HandlerError::InvalidConfig(
                "token must be a non-empty string".to_string(),
            ));
        }

        if let ChatId::Text(name) = &self.chat_id {
            if name.trim().is_empty() {
                return Err(HandlerError::InvalidConfig(
                    "chat_id must not be empty".to_string(),
                ));
            }
        }

        if !(1..=300).contains(&self.timeout_secs) {
            return Err(HandlerError::InvalidConfig(
                "timeout_secs must be between 1 and 300".to_string(),
            ));
        }

        if self.bot_api.trim().is_empty() {
            return Err(HandlerError::InvalidConfig(
                "bot_api must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Request URL for `token`.
    pub fn endpoint(&self, token: &str) -> String {
        if self.bot_api.contains(PUBLIC_BOT_API) {
            format!("{}{token}/SendMessage", self.bot_api)
        } else {
            self.bot_api.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_default_config_valid() {
        assert!(HandlerConfig::new("token", "@channel").validate().is_ok());
        assert!(HandlerConfig::new("token", 123456_i64).validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = HandlerConfig::new("", 1_i64);
        assert!(config.validate().is_err());

        config.token = "valid_token".to_string();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());

        config.timeout_secs = 301;
        assert!(config.validate().is_err());

        config.timeout_secs = 300;
        assert!(config.validate().is_ok());

        config.chat_id = ChatId::from("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let config: HandlerConfig =
            serde_json::from_value(json!({"token": "t", "chat_id": -100123})).unwrap();
        assert_eq!(config, HandlerConfig::new("t", -100123_i64));
        assert_eq!(config.bot_api, "https://api.telegram.org/bot");
        assert_eq!(config.timeout_secs, 5);
        assert!(config.verify_ssl);
    }

    #[test]
    fn test_endpoint_for_public_api() {
        let config = HandlerConfig::new("abc:123", 1_i64);
        assert_eq!(
            config.endpoint("abc:123"),
            "https://api.telegram.org/botabc:123/SendMessage"
        );
    }

    #[test]
    fn test_custom_endpoint_used_verbatim() {
        let mut config = HandlerConfig::new("abc", 1_i64);
        config.bot_api = "https://relay.example.com/send".to_string();
        assert_eq!(config.endpoint("abc"), "https://relay.example.com/send");
    }

    #[test]
    fn test_chat_id_from_json() {
        assert_eq!(ChatId::from_json(&json!(42)), Some(ChatId::Int(42)));
        assert_eq!(ChatId::from_json(&json!("@ops")), Some(ChatId::from("@ops")));
        assert_eq!(ChatId::from_json(&json!("")), None);
        assert_eq!(ChatId::from_json(&json!([1])), None);
    }
}
