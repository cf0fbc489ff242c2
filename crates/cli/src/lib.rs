//! Operator tooling for topic routing: resolve events offline, inspect the
//! marker the scanner sees on a method, and check configuration files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use topic_detector::{
    Detection, DetectorConfig, EnvironmentSnapshot, LogEvent, RouteAction, TopicDetector,
};
use topic_handler::{Delivery, HandlerConfig, LogHandler};

/// One event and the environment it was raised in.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResolveInput {
    pub event: LogEvent,

    #[serde(default)]
    pub environment: EnvironmentSnapshot,

    /// Shorthand for `environment.route`, as `Class@method`
    #[serde(default)]
    pub route_action: Option<String>,
}

impl ResolveInput {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut input: Self = serde_json::from_str(raw).context("Invalid resolve input")?;
        if let Some(action) = input.route_action.take() {
            input.environment.route = Some(RouteAction::parse(&action));
        }
        Ok(input)
    }
}

/// Detector configuration plus the optional `[handler]` table of the same file.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub detector: DetectorConfig,
    pub handler: Option<HandlerConfig>,
}

impl RouterConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let detector = DetectorConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?;

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let table: toml::Table = toml::from_str(&raw).context("Invalid TOML")?;
        let handler = match table.get("handler") {
            Some(value) => {
                let handler: HandlerConfig = value
                    .clone()
                    .try_into()
                    .context("Invalid [handler] table")?;
                handler.validate()?;
                Some(handler)
            }
            None => None,
        };

        Ok(Self { detector, handler })
    }

    pub fn detector(&self) -> Result<TopicDetector> {
        Ok(TopicDetector::new(self.detector.clone())?)
    }
}

/// `{"topic_id": ...}`, plus the detection trace when `explain` is set.
pub fn resolve(config: &RouterConfig, input: &ResolveInput, explain: bool) -> Result<Value> {
    let detector = config.detector()?;
    let detection: Detection = detector.detect_ambient(&input.event, &input.environment);
    log::debug!(
        "Resolved {} context to {:?}",
        detection.context,
        detection.topic
    );

    let mut out = json!({ "topic_id": detection.topic });
    if explain {
        out["outcome"] = serde_json::to_value(detection.outcome())?;
        out["detection"] = serde_json::to_value(&detection)?;
    }
    Ok(out)
}

/// Marker the source scanner reads for `class::method`, or `null`.
pub fn scan(config: &RouterConfig, class: &str, method: &str) -> Result<Value> {
    let detector = config.detector()?;
    let marker = match detector.scan(class, method) {
        Ok(marker) => Some(marker),
        Err(miss) => {
            log::info!("No marker for {class}::{method}: {miss}");
            None
        }
    };
    let topic = marker
        .as_deref()
        .and_then(|marker| detector.mapping().get(marker));
    Ok(json!({
        "class": class,
        "method": method,
        "marker": marker,
        "topic_id": topic,
    }))
}

/// Delivery the handler would dispatch for the input, or `null` when the
/// event is below the handler's level.
pub fn plan(config: &RouterConfig, input: &ResolveInput) -> Result<Value> {
    let handler_config = config
        .handler
        .clone()
        .context("Config has no [handler] table")?;
    let handler = LogHandler::from_configs(
        handler_config,
        config.detector.clone(),
        |_: Delivery| Ok::<(), topic_handler::HandlerError>(()),
    )?;
    let delivery = handler.plan_ambient(&input.event, &input.environment);
    Ok(serde_json::to_value(delivery)?)
}

/// Summary of a validated configuration.
pub fn check_config(config: &RouterConfig) -> Result<Value> {
    config.detector.validate()?;
    let topics: Vec<Value> = config
        .detector
        .topics
        .iter()
        .map(|(marker, topic)| json!({ "marker": marker, "topic_id": topic }))
        .collect();

    Ok(json!({
        "valid": true,
        "source_root": config.detector.source_root.display().to_string(),
        "topics": topics,
        "handler": config.handler.is_some(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use topic_detector::{Level, TopicMapping};

    #[test]
    fn route_shorthand_fills_environment() {
        let input = ResolveInput::parse(
            r#"{"event": {"message": "x"}, "route_action": "App\\Http\\Controllers\\Pay@store"}"#,
        )
        .unwrap();
        assert_eq!(input.event.level, Level::Debug);
        assert_eq!(
            input.environment.route,
            Some(RouteAction::parse("App\\Http\\Controllers\\Pay@store"))
        );
    }

    #[test]
    fn override_resolves_without_source() {
        let config = RouterConfig {
            detector: DetectorConfig::with_topics(TopicMapping::default()),
            handler: None,
        };
        let input = ResolveInput::parse(
            r#"{"event": {"message": "x", "context": {"topic_id": "ops"}}}"#,
        )
        .unwrap();
        assert_eq!(
            resolve(&config, &input, false).unwrap(),
            json!({"topic_id": "ops"})
        );
    }

    #[test]
    fn plan_without_handler_fails() {
        let config = RouterConfig {
            detector: DetectorConfig::default(),
            handler: None,
        };
        assert!(plan(&config, &ResolveInput::default()).is_err());
    }
}
