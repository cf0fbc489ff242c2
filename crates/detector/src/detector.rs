use crate::config::DetectorConfig;
use crate::context::{classify, AmbientProbe, ExecutionContext, RouteAction};
use crate::error::{Result, ScanMiss};
use crate::event::LogEvent;
use crate::frame::first_class_in_namespace;
use crate::mapping::{TopicId, TopicMapping};
use crate::payload::ComponentPayloadParser;
use crate::registry::MarkerRegistry;
use crate::scanner::SourceScanner;
use serde::Serialize;
use serde_json::Value;

/// Furthest point a single resolution reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStage {
    Start,
    ContextClassified,
    TargetLocated,
    MarkerResolved,
    TopicResolved,
    NoTopic,
}

/// Which strategy produced the topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerSource {
    Override,
    Registry,
    SourceScan,
}

/// Type and method whose marker decides the topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub class: String,
    pub method: String,
}

impl Target {
    pub fn new(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
        }
    }
}

/// Trace of one resolution call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub context: &'static str,
    pub reached: DetectionStage,
    pub target: Option<Target>,
    pub marker: Option<String>,
    pub source: Option<MarkerSource>,
    pub topic: Option<TopicId>,
}

impl Detection {
    fn start(context: &'static str) -> Self {
        Self {
            context,
            reached: DetectionStage::Start,
            target: None,
            marker: None,
            source: None,
            topic: None,
        }
    }

    /// Terminal state: [`DetectionStage::TopicResolved`] or
    /// [`DetectionStage::NoTopic`].
    pub fn outcome(&self) -> DetectionStage {
        if self.topic.is_some() {
            DetectionStage::TopicResolved
        } else {
            DetectionStage::NoTopic
        }
    }
}

/// Resolves the topic of a log event from the code that raised it.
///
/// Resolution never fails: every miss degrades to "no topic" so the event
/// still reaches the default route. The detector holds no mutable state and
/// caches nothing between calls.
#[derive(Debug, Clone)]
pub struct TopicDetector {
    config: DetectorConfig,
    registry: MarkerRegistry,
    scanner: SourceScanner,
    components: ComponentPayloadParser,
}

impl TopicDetector {
    /// Build from configuration. The registry starts with every link-time
    /// [`crate::MarkerRegistration`].
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        let scanner = SourceScanner::new(
            &config.source_root,
            config.layout(),
            config.max_source_bytes,
        );
        let components = ComponentPayloadParser::new(config.component_namespace.clone());
        Ok(Self {
            config,
            registry: MarkerRegistry::collected(),
            scanner,
            components,
        })
    }

    /// Build with default settings from a JSON marker → topic object.
    /// A mapping of the wrong shape is rejected here, not at resolution time.
    pub fn from_json_mapping(topics: &Value) -> Result<Self> {
        Self::new(DetectorConfig::with_topics(TopicMapping::from_json(topics)?))
    }

    pub fn with_registry(mut self, registry: MarkerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn mapping(&self) -> &TopicMapping {
        &self.config.topics
    }

    pub fn registry(&self) -> &MarkerRegistry {
        &self.registry
    }

    /// Topic for `event` raised under `context`, if one can be inferred.
    pub fn resolve(&self, event: &LogEvent, context: &ExecutionContext) -> Option<TopicId> {
        self.detect(event, context).topic
    }

    /// Classify the environment through `probe`, then resolve.
    pub fn resolve_ambient<P: AmbientProbe + ?Sized>(
        &self,
        event: &LogEvent,
        probe: &P,
    ) -> Option<TopicId> {
        self.detect_ambient(event, probe).topic
    }

    pub fn detect_ambient<P: AmbientProbe + ?Sized>(&self, event: &LogEvent, probe: &P) -> Detection {
        if let Some(detection) = self.detect_override(event) {
            return detection;
        }
        self.detect(event, &classify(probe))
    }

    pub fn detect(&self, event: &LogEvent, context: &ExecutionContext) -> Detection {
        if let Some(detection) = self.detect_override(event) {
            return detection;
        }

        let mut detection = Detection::start(context.name());
        detection.reached = DetectionStage::ContextClassified;
        log::debug!("Detecting topic in {} context", context.name());

        let Some(target) = self.locate_target(event, context) else {
            log::debug!("No target located in {} context", context.name());
            return detection;
        };
        log::debug!("Target located: {}::{}", target.class, target.method);
        detection.reached = DetectionStage::TargetLocated;
        detection.target = Some(target.clone());

        if let Some((marker, topic)) = self.registry.resolve(&target.class, &target.method, self.mapping()) {
            log::debug!("Marker {marker} found in registry");
            detection.reached = DetectionStage::MarkerResolved;
            detection.marker = Some(marker);
            detection.source = Some(MarkerSource::Registry);
            detection.topic = Some(topic.clone());
            return detection;
        }

        let marker = match self.scanner.scan_class(&target.class, &target.method) {
            Ok(marker) => marker,
            Err(miss) => {
                report_miss(&target, &miss);
                return detection;
            }
        };
        log::debug!("Marker {marker} found in source");
        detection.reached = DetectionStage::MarkerResolved;
        detection.source = Some(MarkerSource::SourceScan);
        detection.topic = self.mapping().get(&marker).cloned();
        if detection.topic.is_none() {
            log::debug!("Marker {marker} has no topic");
        }
        detection.marker = Some(marker);
        detection
    }

    /// Marker the source scanner finds for `class::method`.
    pub fn scan(&self, class: &str, method: &str) -> std::result::Result<String, ScanMiss> {
        self.scanner.scan_class(class, method)
    }

    fn detect_override(&self, event: &LogEvent) -> Option<Detection> {
        let topic = event.topic_override()?;
        log::debug!("Explicit topic override {topic}");
        let mut detection = Detection::start("override");
        detection.source = Some(MarkerSource::Override);
        detection.topic = Some(topic);
        Some(detection)
    }

    fn locate_target(&self, event: &LogEvent, context: &ExecutionContext) -> Option<Target> {
        match context {
            ExecutionContext::HttpRequest(RouteAction::Controller { class, method }) => {
                Some(Target::new(class.as_str(), method.as_str()))
            }
            ExecutionContext::HttpRequest(RouteAction::Closure) => None,
            ExecutionContext::QueuedJob => {
                self.class_from_frames(event, &self.config.jobs_namespace)
            }
            ExecutionContext::ConsoleCommand => {
                self.class_from_frames(event, &self.config.commands_namespace)
            }
            ExecutionContext::ComponentUpdate(payload) => {
                let component = self.components.parse(payload);
                Some(Target::new(component.class?, component.method?))
            }
            ExecutionContext::Unknown => None,
        }
    }

    fn class_from_frames(&self, event: &LogEvent, namespace: &str) -> Option<Target> {
        let class = first_class_in_namespace(event.frames(), namespace)?;
        Some(Target::new(class, self.config.handle_method.as_str()))
    }
}

fn report_miss(target: &Target, miss: &ScanMiss) {
    if miss.is_rejection() {
        log::warn!(
            "Refusing to scan source for {}::{}: {miss}",
            target.class,
            target.method
        );
    } else {
        log::debug!(
            "No marker in source for {}::{}: {miss}",
            target.class,
            target.method
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ErrorRecord, Level};
    use crate::frame::CallFrame;
    use serde_json::json;

    fn detector() -> TopicDetector {
        let mapping = TopicMapping::new([("Emergency", 1_i64), ("Critical", 2_i64)]).unwrap();
        TopicDetector::new(DetectorConfig {
            source_root: "/nonexistent-source-root".into(),
            ..DetectorConfig::with_topics(mapping)
        })
        .unwrap()
        .with_registry(
            MarkerRegistry::new()
                .with("App\\Jobs\\Charge", "handle", "Critical")
                .with("App\\Http\\Controllers\\Pay", "store", "Emergency"),
        )
    }

    fn job_event() -> LogEvent {
        LogEvent::new(Level::Error, "failed").with_error(ErrorRecord {
            frames: vec![
                CallFrame::method("App\\Jobs\\Charge", "handle"),
                CallFrame::method("Illuminate\\Queue\\Worker", "process"),
            ],
            ..Default::default()
        })
    }

    #[test]
    fn override_short_circuits() {
        let event = job_event().with_context("topic_id", 77);
        let detection = detector().detect(&event, &ExecutionContext::QueuedJob);
        assert_eq!(detection.topic, Some(TopicId::Int(77)));
        assert_eq!(detection.source, Some(MarkerSource::Override));
        assert_eq!(detection.reached, DetectionStage::Start);
        assert!(detection.target.is_none());
    }

    #[test]
    fn job_resolves_through_registry() {
        let detection = detector().detect(&job_event(), &ExecutionContext::QueuedJob);
        assert_eq!(detection.outcome(), DetectionStage::TopicResolved);
        assert_eq!(detection.topic, Some(TopicId::Int(2)));
        assert_eq!(detection.source, Some(MarkerSource::Registry));
        assert_eq!(
            detection.target,
            Some(Target::new("App\\Jobs\\Charge", "handle"))
        );
    }

    #[test]
    fn job_frames_ignored_in_command_context() {
        let detection = detector().detect(&job_event(), &ExecutionContext::ConsoleCommand);
        assert_eq!(detection.outcome(), DetectionStage::NoTopic);
        assert_eq!(detection.reached, DetectionStage::ContextClassified);
    }

    #[test]
    fn controller_route_resolves() {
        let context = ExecutionContext::HttpRequest(RouteAction::parse(
            "App\\Http\\Controllers\\Pay@store",
        ));
        let event = LogEvent::new(Level::Error, "x");
        assert_eq!(detector().resolve(&event, &context), Some(TopicId::Int(1)));
    }

    #[test]
    fn closure_route_has_no_topic() {
        let context = ExecutionContext::HttpRequest(RouteAction::Closure);
        let event = LogEvent::new(Level::Error, "x");
        assert_eq!(detector().resolve(&event, &context), None);
    }

    #[test]
    fn unknown_context_has_no_topic() {
        let detection = detector().detect(&job_event(), &ExecutionContext::Unknown);
        assert_eq!(detection.outcome(), DetectionStage::NoTopic);
        assert_eq!(detection.context, "unknown");
    }

    #[test]
    fn scan_miss_degrades_to_no_topic() {
        let context = ExecutionContext::HttpRequest(RouteAction::parse(
            "App\\Http\\Controllers\\Missing@index",
        ));
        let detection = detector().detect(&LogEvent::new(Level::Error, "x"), &context);
        assert_eq!(detection.reached, DetectionStage::TargetLocated);
        assert_eq!(detection.topic, None);
    }

    #[test]
    fn invalid_mapping_fails_construction() {
        assert!(TopicDetector::from_json_mapping(&json!("Emergency")).is_err());
        assert!(TopicDetector::from_json_mapping(&json!({"Emergency": 5})).is_ok());
    }

    #[test]
    fn resolution_is_idempotent() {
        let detector = detector();
        let event = job_event();
        let first = detector.detect(&event, &ExecutionContext::QueuedJob);
        let second = detector.detect(&event, &ExecutionContext::QueuedJob);
        assert_eq!(first, second);
    }
}
