use crate::error::{DetectorError, Result};
use crate::marker::{marker_key, Marker};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Destination sub-channel within one outbound notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopicId {
    Int(i64),
    Text(String),
}

impl TopicId {
    /// Interpret a JSON scalar as a topic id. Anything but an integer or a
    /// string is rejected.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(TopicId::Int),
            Value::String(s) => Some(TopicId::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicId::Int(id) => write!(f, "{id}"),
            TopicId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for TopicId {
    fn from(id: i64) -> Self {
        TopicId::Int(id)
    }
}

impl From<&str> for TopicId {
    fn from(id: &str) -> Self {
        TopicId::Text(id.to_string())
    }
}

impl From<String> for TopicId {
    fn from(id: String) -> Self {
        TopicId::Text(id)
    }
}

/// Ordered marker → topic table, fixed for the detector's lifetime.
///
/// Keys are stored normalized (see [`marker_key`]), so `EmergencyAttribute`
/// and `Emergency` address the same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicMapping {
    entries: Vec<(String, TopicId)>,
}

impl TopicMapping {
    pub fn new<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<TopicId>,
    {
        let mut mapping = Self::default();
        for (marker, topic) in entries {
            mapping.insert(marker.as_ref(), topic.into())?;
        }
        Ok(mapping)
    }

    /// Build from a JSON object such as `{"Emergency": 12345, "Debug": "ops"}`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(DetectorError::invalid_mapping(format!(
                "expected an object of marker → topic id, got {}",
                json_kind(value)
            )));
        };

        let mut mapping = Self::default();
        for (marker, raw) in map {
            let topic = TopicId::from_json(raw).ok_or_else(|| {
                DetectorError::invalid_mapping(format!(
                    "topic id for '{marker}' must be an integer or a string, got {}",
                    json_kind(raw)
                ))
            })?;
            mapping.insert(marker, topic)?;
        }
        Ok(mapping)
    }

    fn insert(&mut self, marker: &str, topic: TopicId) -> Result<()> {
        let key = marker_key(marker);
        if key.is_empty() {
            return Err(DetectorError::invalid_mapping("marker name is empty"));
        }
        if self.entries.iter().any(|(existing, _)| existing == &key) {
            return Err(DetectorError::invalid_mapping(format!(
                "marker '{key}' is declared more than once"
            )));
        }
        self.entries.push((key, topic));
        Ok(())
    }

    /// Look up a marker by any spelling that normalizes to a stored key.
    pub fn get(&self, marker: &str) -> Option<&TopicId> {
        let key = marker_key(marker);
        self.entries
            .iter()
            .find(|(existing, _)| existing == &key)
            .map(|(_, topic)| topic)
    }

    pub fn get_marker(&self, marker: Marker) -> Option<&TopicId> {
        self.get(marker.as_str())
    }

    pub fn contains(&self, marker: &str) -> bool {
        self.get(marker).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TopicId)> {
        self.entries
            .iter()
            .map(|(marker, topic)| (marker.as_str(), topic))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a non-integer number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Serialize for TopicMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (marker, topic) in &self.entries {
            map.serialize_entry(marker, topic)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TopicMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = TopicMapping;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of marker → topic id")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<TopicMapping, A::Error> {
                let mut mapping = TopicMapping::default();
                while let Some((marker, topic)) = access.next_entry::<String, TopicId>()? {
                    mapping
                        .insert(&marker, topic)
                        .map_err(serde::de::Error::custom)?;
                }
                Ok(mapping)
            }
        }

        deserializer.deserialize_map(MappingVisitor)
    }
}
