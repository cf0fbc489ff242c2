//! # Topic Detector
//!
//! Infers which topic of an outbound notification channel a log event
//! belongs to, from the code that raised it, with no routing at the call
//! site.
//!
//! ## Pipeline
//!
//! ```text
//! LogEvent + ExecutionContext
//!     │
//!     ├──> Explicit override in event context? ──> topic (verbatim)
//!     │
//!     ├──> Locate target (type + method)
//!     │      ├─ HTTP request     → route controller action
//!     │      ├─ Queued job       → first frame under the jobs namespace
//!     │      ├─ Console command  → first frame under the commands namespace
//!     │      └─ Component update → snapshot name + first call
//!     │
//!     ├──> Resolve marker
//!     │      ├─ Marker registry (declared at startup / link time)
//!     │      └─ Source scan (path-guarded, best effort)
//!     │
//!     └──> Marker → topic via TopicMapping, else no topic
//! ```
//!
//! ## Example
//!
//! ```rust
//! use topic_detector::{
//!     CallFrame, DetectorConfig, ErrorRecord, ExecutionContext, Level, LogEvent,
//!     MarkerRegistry, TopicDetector, TopicId, TopicMapping,
//! };
//!
//! let topics = TopicMapping::new([("Critical", 42_i64)]).unwrap();
//! let detector = TopicDetector::new(DetectorConfig::with_topics(topics))
//!     .unwrap()
//!     .with_registry(MarkerRegistry::new().with("App\\Jobs\\ChargeCards", "handle", "Critical"));
//!
//! let event = LogEvent::new(Level::Error, "card declined").with_error(ErrorRecord {
//!     frames: vec![CallFrame::method("App\\Jobs\\ChargeCards", "handle")],
//!     ..Default::default()
//! });
//!
//! assert_eq!(
//!     detector.resolve(&event, &ExecutionContext::QueuedJob),
//!     Some(TopicId::Int(42))
//! );
//! ```

mod config;
mod context;
mod detector;
mod error;
mod event;
mod frame;
mod mapping;
mod marker;
mod path_guard;
mod payload;
mod registry;
mod scanner;

pub use config::DetectorConfig;
pub use context::{classify, AmbientProbe, EnvironmentSnapshot, ExecutionContext, RouteAction};
pub use detector::{Detection, DetectionStage, MarkerSource, Target, TopicDetector};
pub use error::{DetectorError, GuardRejection, Result, ScanMiss};
pub use event::{
    ErrorRecord, Level, LogEvent, CHAT_OVERRIDE_KEY, TOKEN_OVERRIDE_KEY, TOPIC_OVERRIDE_KEY,
};
pub use frame::{first_class_in_namespace, in_namespace, CallFrame, CallKind};
pub use mapping::{TopicId, TopicMapping};
pub use marker::{marker_key, Marker};
pub use path_guard::PathGuard;
pub use payload::{component_class, ComponentPayloadParser, ComponentTarget};
pub use registry::{MarkerRegistration, MarkerRegistry};
pub use scanner::{attribute_regex, scan_annotations, scan_marker, SourceLayout, SourceScanner};

pub use inventory;
