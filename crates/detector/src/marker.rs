use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity/category marker attached to a job, command, controller action or
/// component method.
///
/// Markers carry no behavior; they only key into a [`crate::TopicMapping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Marker {
    Emergency,
    Critical,
    Important,
    Information,
    Debug,
    LowPriority,
}

impl Marker {
    pub const ALL: [Marker; 6] = [
        Marker::Emergency,
        Marker::Critical,
        Marker::Important,
        Marker::Information,
        Marker::Debug,
        Marker::LowPriority,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Marker::Emergency => "Emergency",
            Marker::Critical => "Critical",
            Marker::Important => "Important",
            Marker::Information => "Information",
            Marker::Debug => "Debug",
            Marker::LowPriority => "LowPriority",
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Marker {
    type Err = String;

    /// Accepts any spelling that normalizes to a known marker, e.g.
    /// `Critical`, `CriticalAttribute` or `\Vendor\Attributes\CriticalAttribute`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key = marker_key(raw);
        Marker::ALL
            .into_iter()
            .find(|marker| marker.as_str() == key)
            .ok_or_else(|| format!("unknown marker '{raw}'"))
    }
}

/// Normalize a marker identifier into its lookup key.
///
/// Drops any leading namespace path and a trailing `Attribute` suffix.
pub fn marker_key(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('\\');
    let short = trimmed.rsplit('\\').next().unwrap_or(trimmed);
    match short.strip_suffix("Attribute") {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => short.to_string(),
    }
}
