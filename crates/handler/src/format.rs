use topic_detector::LogEvent;

/// Renders a log event as message text.
pub trait Format {
    fn format(&self, event: &LogEvent) -> String;
}

/// `channel.LEVEL: message`, followed by the context as JSON when present
/// and the attached error on its own line.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

impl Format for PlainFormatter {
    fn format(&self, event: &LogEvent) -> String {
        let mut text = if event.channel.is_empty() {
            format!("{}: {}", event.level, event.message)
        } else {
            format!("{}.{}: {}", event.channel, event.level, event.message)
        };

        if !event.context.is_empty() {
            if let Ok(context) = serde_json::to_string(&event.context) {
                text.push(' ');
                text.push_str(&context);
            }
        }

        if let Some(error) = &event.error {
            text.push('\n');
            match &error.class {
                Some(class) => text.push_str(&format!("{class}: {}", error.message)),
                None => text.push_str(&error.message),
            }
        }
        text
    }
}

impl<F: Fn(&LogEvent) -> String> Format for F {
    fn format(&self, event: &LogEvent) -> String {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use topic_detector::{ErrorRecord, Level};

    #[test]
    fn formats_channel_level_and_message() {
        let event = LogEvent::new(Level::Error, "disk full").with_channel("production");
        assert_eq!(PlainFormatter.format(&event), "production.ERROR: disk full");
    }

    #[test]
    fn appends_context_and_error() {
        let event = LogEvent::new(Level::Critical, "charge failed")
            .with_context("order", 17)
            .with_error(ErrorRecord {
                class: Some("RuntimeException".to_string()),
                message: "card declined".to_string(),
                frames: Vec::new(),
            });
        assert_eq!(
            PlainFormatter.format(&event),
            "CRITICAL: charge failed {\"order\":17}\nRuntimeException: card declined"
        );
    }
}
