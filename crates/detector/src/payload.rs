use serde_json::Value;

/// Target recovered from a component update payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentTarget {
    /// Synthetic fully-qualified class, e.g. `\App\Http\Livewire\User\Profile`
    pub class: Option<String>,

    /// First invoked method
    pub method: Option<String>,
}

/// Reads `{components: [{snapshot: "<json>", calls: [{method, params}]}]}`.
#[derive(Debug, Clone)]
pub struct ComponentPayloadParser {
    namespace: String,
}

impl ComponentPayloadParser {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Only the first component entry is considered. A missing `components`
    /// key or a malformed snapshot yields an empty target; the latter is
    /// reported on the error log and is otherwise non-fatal.
    pub fn parse(&self, payload: &Value) -> ComponentTarget {
        let Some(first) = payload
            .get("components")
            .and_then(Value::as_array)
            .and_then(|components| components.first())
        else {
            return ComponentTarget::default();
        };

        let name = match first.get("snapshot") {
            Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
                Ok(snapshot) => memo_name(&snapshot),
                Err(err) => {
                    log::error!("Malformed component snapshot: {err}");
                    return ComponentTarget::default();
                }
            },
            Some(snapshot @ Value::Object(_)) => memo_name(snapshot),
            _ => None,
        };

        let method = first
            .pointer("/calls/0/method")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        ComponentTarget {
            class: name.and_then(|name| component_class(&self.namespace, &name)),
            method,
        }
    }
}

fn memo_name(snapshot: &Value) -> Option<String> {
    snapshot
        .pointer("/memo/name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Build `\<namespace>\<Segment>\...` from a dotted component name.
pub fn component_class(namespace: &str, dotted: &str) -> Option<String> {
    let segments: Vec<String> = dotted
        .split('.')
        .map(studly)
        .collect::<Option<Vec<_>>>()?;

    let namespace = namespace.trim_matches('\\');
    let mut class = String::new();
    if !namespace.is_empty() {
        class.push('\\');
        class.push_str(namespace);
    }
    for segment in segments {
        class.push('\\');
        class.push_str(&segment);
    }
    Some(class)
}

/// `user-profile` → `UserProfile`; an empty segment is invalid.
fn studly(segment: &str) -> Option<String> {
    let out: String = segment
        .split(|c: char| matches!(c, '-' | '_' | ' '))
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    (!out.is_empty()).then_some(out)
}
