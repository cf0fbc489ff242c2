use serde::{Deserialize, Serialize};

/// How a frame's function was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CallKind {
    /// `->` instance call
    #[serde(rename = "->")]
    Instance,

    /// `::` static call
    #[serde(rename = "::")]
    Static,

    /// Plain function, no owning type
    #[default]
    #[serde(rename = "")]
    Function,
}

/// One step of a captured call chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFrame {
    #[serde(default)]
    pub file: Option<String>,

    #[serde(default)]
    pub line: Option<u32>,

    #[serde(default)]
    pub function: String,

    /// Owning type, fully qualified with `\` separators
    #[serde(default)]
    pub class: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: CallKind,
}

impl CallFrame {
    pub fn method(class: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            class: Some(class.into()),
            kind: CallKind::Instance,
            ..Default::default()
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }
}

/// Whether `class` lives under `namespace`, matching whole `\`-separated
/// segments. A leading `\` on either side is ignored.
pub fn in_namespace(class: &str, namespace: &str) -> bool {
    let class = class.trim_start_matches('\\');
    let namespace = namespace.trim_start_matches('\\').trim_end_matches('\\');
    if namespace.is_empty() {
        return false;
    }
    class
        .strip_prefix(namespace)
        .is_some_and(|rest| rest.starts_with('\\') && rest.len() > 1)
}

/// First frame, scanning in order, whose owning type is under `namespace`.
///
/// Dispatch and runtime frames around the job or command are skipped; no
/// fixed frame index is assumed.
pub fn first_class_in_namespace<'a>(frames: &'a [CallFrame], namespace: &str) -> Option<&'a str> {
    frames
        .iter()
        .filter_map(|frame| frame.class.as_deref())
        .find(|class| in_namespace(class, namespace))
}
