use crate::config::{ChatId, HandlerConfig};
use crate::error::Result;
use crate::format::{Format, PlainFormatter};
use serde::Serialize;
use topic_detector::{
    AmbientProbe, DetectorConfig, ExecutionContext, LogEvent, TopicDetector, TopicId, CHAT_OVERRIDE_KEY,
    TOKEN_OVERRIDE_KEY,
};

/// How a delivery is handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "queue", rename_all = "snake_case")]
pub enum DeliveryMode {
    Sync,
    Queued(String),
}

/// Everything the transport needs to send one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delivery {
    pub endpoint: String,
    pub chat_id: ChatId,
    pub topic_id: Option<TopicId>,
    pub text: String,
    pub mode: DeliveryMode,
    pub proxy: Option<String>,
    pub timeout_secs: u64,
    pub verify_ssl: bool,
}

/// Transport seam. Sending, retrying and truncating are the implementor's
/// concern.
pub trait Dispatch {
    fn dispatch(&self, delivery: Delivery) -> Result<()>;
}

impl<F: Fn(Delivery) -> Result<()>> Dispatch for F {
    fn dispatch(&self, delivery: Delivery) -> Result<()> {
        self(delivery)
    }
}

/// Routes log events to a chat topic chosen by the detector.
pub struct LogHandler<D, F = PlainFormatter> {
    config: HandlerConfig,
    detector: TopicDetector,
    dispatcher: D,
    formatter: F,
}

impl<D: Dispatch> LogHandler<D, PlainFormatter> {
    pub fn new(config: HandlerConfig, detector: TopicDetector, dispatcher: D) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            detector,
            dispatcher,
            formatter: PlainFormatter,
        })
    }

    /// Build the detector from its configuration as well. An invalid detector
    /// configuration surfaces as [`crate::HandlerError::Detector`].
    pub fn from_configs(
        config: HandlerConfig,
        detector: DetectorConfig,
        dispatcher: D,
    ) -> Result<Self> {
        let detector = TopicDetector::new(detector)?;
        Self::new(config, detector, dispatcher)
    }
}

impl<D: Dispatch, F: Format> LogHandler<D, F> {
    pub fn with_formatter<G: Format>(self, formatter: G) -> LogHandler<D, G> {
        LogHandler {
            config: self.config,
            detector: self.detector,
            dispatcher: self.dispatcher,
            formatter,
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn detector(&self) -> &TopicDetector {
        &self.detector
    }

    pub fn handles(&self, event: &LogEvent) -> bool {
        event.level >= self.config.min_level
    }

    /// Delivery for `event`, or `None` when its level is below the threshold.
    pub fn plan(&self, event: &LogEvent, context: &ExecutionContext) -> Option<Delivery> {
        if !self.handles(event) {
            return None;
        }
        let detected = self.detector.resolve(event, context);
        Some(self.build(event, detected))
    }

    pub fn plan_ambient<P: AmbientProbe + ?Sized>(
        &self,
        event: &LogEvent,
        probe: &P,
    ) -> Option<Delivery> {
        if !self.handles(event) {
            return None;
        }
        let detected = self.detector.resolve_ambient(event, probe);
        Some(self.build(event, detected))
    }

    /// Plan and dispatch. Returns whether the event was handled.
    pub fn handle(&self, event: &LogEvent, context: &ExecutionContext) -> Result<bool> {
        match self.plan(event, context) {
            Some(delivery) => self.send(delivery).map(|()| true),
            None => Ok(false),
        }
    }

    pub fn handle_ambient<P: AmbientProbe + ?Sized>(
        &self,
        event: &LogEvent,
        probe: &P,
    ) -> Result<bool> {
        match self.plan_ambient(event, probe) {
            Some(delivery) => self.send(delivery).map(|()| true),
            None => Ok(false),
        }
    }

    fn send(&self, delivery: Delivery) -> Result<()> {
        log::debug!(
            "Dispatching to chat {} topic {:?} ({:?})",
            delivery.chat_id,
            delivery.topic_id,
            delivery.mode
        );
        self.dispatcher.dispatch(delivery)
    }

    fn build(&self, event: &LogEvent, detected: Option<TopicId>) -> Delivery {
        let token = event
            .context_str(TOKEN_OVERRIDE_KEY)
            .unwrap_or(self.config.token.as_str());
        let chat_id = event
            .context
            .get(CHAT_OVERRIDE_KEY)
            .and_then(ChatId::from_json)
            .unwrap_or_else(|| self.config.chat_id.clone());
        let mode = match self.config.queue.as_deref().map(str::trim) {
            Some(queue) if !queue.is_empty() => DeliveryMode::Queued(queue.to_string()),
            _ => DeliveryMode::Sync,
        };

        Delivery {
            endpoint: self.config.endpoint(token),
            chat_id,
            topic_id: detected.or_else(|| self.config.topic_id.clone()),
            text: self.formatter.format(event),
            mode,
            proxy: self.config.proxy.clone(),
            timeout_secs: self.config.timeout_secs,
            verify_ssl: self.config.verify_ssl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use pretty_assertions::assert_eq;
    use topic_detector::{Level, MarkerRegistry, RouteAction, TopicMapping};

    fn accept(_: Delivery) -> Result<()> {
        Ok(())
    }

    fn handler(config: HandlerConfig) -> LogHandler<fn(Delivery) -> Result<()>> {
        let topics = TopicMapping::new([("Emergency", 11_i64)]).unwrap();
        let detector = TopicDetector::new(topic_detector::DetectorConfig {
            source_root: "/nonexistent-source-root".into(),
            ..topic_detector::DetectorConfig::with_topics(topics)
        })
        .unwrap()
        .with_registry(MarkerRegistry::new().with(
            "App\\Http\\Controllers\\Pay",
            "store",
            "Emergency",
        ));
        LogHandler::new(config, detector, accept as fn(Delivery) -> Result<()>).unwrap()
    }

    fn pay_route() -> ExecutionContext {
        ExecutionContext::HttpRequest(RouteAction::parse("App\\Http\\Controllers\\Pay@store"))
    }

    #[test]
    fn detected_topic_beats_default() {
        let mut config = HandlerConfig::new("tok", -100_i64);
        config.topic_id = Some(TopicId::Int(5));
        let delivery = handler(config)
            .plan(&LogEvent::new(Level::Error, "x"), &pay_route())
            .unwrap();
        assert_eq!(delivery.topic_id, Some(TopicId::Int(11)));
    }

    #[test]
    fn default_topic_used_when_nothing_detected() {
        let mut config = HandlerConfig::new("tok", -100_i64);
        config.topic_id = Some(TopicId::from("general"));
        let delivery = handler(config)
            .plan(&LogEvent::new(Level::Error, "x"), &ExecutionContext::Unknown)
            .unwrap();
        assert_eq!(delivery.topic_id, Some(TopicId::from("general")));
        assert_eq!(delivery.mode, DeliveryMode::Sync);
    }

    #[test]
    fn below_min_level_is_ignored() {
        let mut config = HandlerConfig::new("tok", 1_i64);
        config.min_level = Level::Error;
        let handler = handler(config);
        assert!(handler
            .plan(&LogEvent::new(Level::Warning, "x"), &ExecutionContext::Unknown)
            .is_none());
        assert!(!handler
            .handle(&LogEvent::new(Level::Info, "x"), &ExecutionContext::Unknown)
            .unwrap());
    }

    #[test]
    fn context_overrides_token_and_chat() {
        let config = HandlerConfig::new("tok", 1_i64);
        let event = LogEvent::new(Level::Error, "x")
            .with_context("token", "other")
            .with_context("chat_id", "@alerts");
        let delivery = handler(config).plan(&event, &ExecutionContext::Unknown).unwrap();
        assert_eq!(
            delivery.endpoint,
            "https://api.telegram.org/botother/SendMessage"
        );
        assert_eq!(delivery.chat_id, ChatId::from("@alerts"));
    }

    #[test]
    fn named_queue_defers_delivery() {
        let mut config = HandlerConfig::new("tok", 1_i64);
        config.queue = Some("telegram".to_string());
        let delivery = handler(config)
            .plan(&LogEvent::new(Level::Error, "x"), &ExecutionContext::Unknown)
            .unwrap();
        assert_eq!(delivery.mode, DeliveryMode::Queued("telegram".to_string()));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let detector = TopicDetector::new(topic_detector::DetectorConfig::default()).unwrap();
        let mut config = HandlerConfig::new("tok", 1_i64);
        config.timeout_secs = 0;
        assert!(LogHandler::new(config, detector, accept).is_err());
    }

    #[test]
    fn invalid_detector_config_is_reported_as_detector_error() {
        let detector = topic_detector::DetectorConfig {
            max_source_bytes: 0,
            ..Default::default()
        };
        let err = LogHandler::from_configs(HandlerConfig::new("tok", 1_i64), detector, accept)
            .err()
            .unwrap();
        assert!(matches!(err, HandlerError::Detector(_)), "{err}");
    }

    #[test]
    fn from_configs_builds_working_handler() {
        let handler = LogHandler::from_configs(
            HandlerConfig::new("tok", 1_i64),
            topic_detector::DetectorConfig::default(),
            accept,
        )
        .unwrap();
        assert!(handler
            .handle(&LogEvent::new(Level::Error, "x"), &ExecutionContext::Unknown)
            .unwrap());
    }
}
