use serde::{Deserialize, Serialize};
use serde_json::Value;

const INVOKE_METHOD: &str = "__invoke";

/// Action bound to the current HTTP route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteAction {
    Controller { class: String, method: String },
    /// Closure routes have no describable type
    Closure,
}

impl RouteAction {
    /// Parse a `Class@method` action string. A bare class is an invokable
    /// controller; an empty string is treated as a closure.
    pub fn parse(uses: &str) -> Self {
        let uses = uses.trim();
        if uses.is_empty() {
            return RouteAction::Closure;
        }
        match uses.split_once('@') {
            Some((class, method)) if !class.is_empty() && !method.is_empty() => {
                RouteAction::Controller {
                    class: class.to_string(),
                    method: method.to_string(),
                }
            }
            Some(_) => RouteAction::Closure,
            None => RouteAction::Controller {
                class: uses.to_string(),
                method: INVOKE_METHOD.to_string(),
            },
        }
    }
}

/// The single environment active when an event fires.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionContext {
    HttpRequest(RouteAction),
    QueuedJob,
    ConsoleCommand,
    /// Reactive component update; carries the raw request payload
    ComponentUpdate(Value),
    Unknown,
}

impl ExecutionContext {
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionContext::HttpRequest(_) => "http_request",
            ExecutionContext::QueuedJob => "queued_job",
            ExecutionContext::ConsoleCommand => "console_command",
            ExecutionContext::ComponentUpdate(_) => "component_update",
            ExecutionContext::Unknown => "unknown",
        }
    }
}

/// Read-only questions about the host environment.
pub trait AmbientProbe {
    fn queue_worker_bound(&self) -> bool;

    fn console_kernel_running(&self) -> bool;

    fn current_route(&self) -> Option<RouteAction>;

    /// Raw payload of the current request when it is a component update.
    fn component_payload(&self) -> Option<&Value>;
}

/// Plain-data description of the environment, for front ends that know
/// where they run (and for tests that flip indicators between calls).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    #[serde(default)]
    pub queue_worker: bool,

    #[serde(default)]
    pub console_kernel: bool,

    #[serde(default)]
    pub route: Option<RouteAction>,

    #[serde(default)]
    pub component_request: bool,

    #[serde(default)]
    pub request_payload: Option<Value>,
}

impl AmbientProbe for EnvironmentSnapshot {
    fn queue_worker_bound(&self) -> bool {
        self.queue_worker
    }

    fn console_kernel_running(&self) -> bool {
        self.console_kernel
    }

    fn current_route(&self) -> Option<RouteAction> {
        self.route.clone()
    }

    fn component_payload(&self) -> Option<&Value> {
        if !self.component_request {
            return None;
        }
        self.request_payload.as_ref()
    }
}

/// Decide which context holds, highest precedence first: queue worker,
/// console kernel, current route (a component update when the request
/// carries a component payload), otherwise unknown.
///
/// Explicit overrides on the event are handled by the detector before
/// classification.
pub fn classify<P: AmbientProbe + ?Sized>(probe: &P) -> ExecutionContext {
    if probe.queue_worker_bound() {
        return ExecutionContext::QueuedJob;
    }
    if probe.console_kernel_running() {
        return ExecutionContext::ConsoleCommand;
    }
    let Some(route) = probe.current_route() else {
        return ExecutionContext::Unknown;
    };
    match probe.component_payload() {
        Some(payload) => ExecutionContext::ComponentUpdate(payload.clone()),
        None => ExecutionContext::HttpRequest(route),
    }
}
