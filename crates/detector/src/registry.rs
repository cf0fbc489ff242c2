//! Declared markers, keyed by (type, method).
//!
//! Stands in for runtime attribute reflection: markers are registered
//! explicitly at startup, or submitted at link time with
//! [`inventory::submit!`] and gathered by [`MarkerRegistry::collected`].
//!
//! ```rust,ignore
//! use topic_detector::{MarkerRegistration, MarkerRegistry};
//!
//! topic_detector::inventory::submit! {
//!     MarkerRegistration::new("App\\Jobs\\ChargeCards", "handle", "Critical")
//! }
//!
//! let registry = MarkerRegistry::collected();
//! assert_eq!(registry.markers("App\\Jobs\\ChargeCards", "handle"), ["Critical"]);
//! ```

use crate::mapping::{TopicId, TopicMapping};
use std::collections::HashMap;

/// Link-time marker declaration.
#[derive(Debug)]
pub struct MarkerRegistration {
    pub class: &'static str,
    pub method: &'static str,
    pub marker: &'static str,
}

impl MarkerRegistration {
    pub const fn new(class: &'static str, method: &'static str, marker: &'static str) -> Self {
        Self {
            class,
            method,
            marker,
        }
    }
}

inventory::collect!(MarkerRegistration);

#[derive(Debug, Clone, Default)]
pub struct MarkerRegistry {
    entries: HashMap<(String, String), Vec<String>>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with every [`MarkerRegistration`] linked into the
    /// binary.
    pub fn collected() -> Self {
        let mut registry = Self::new();
        for registration in inventory::iter::<MarkerRegistration>() {
            registry.register(registration.class, registration.method, registration.marker);
        }
        registry
    }

    /// Attach `marker` to `class::method`. Markers keep registration order.
    pub fn register(
        &mut self,
        class: impl AsRef<str>,
        method: impl Into<String>,
        marker: impl Into<String>,
    ) -> &mut Self {
        self.entries
            .entry((normalize_class(class.as_ref()), method.into()))
            .or_default()
            .push(marker.into());
        self
    }

    pub fn with(mut self, class: impl AsRef<str>, method: impl Into<String>, marker: impl Into<String>) -> Self {
        self.register(class, method, marker);
        self
    }

    pub fn markers(&self, class: &str, method: &str) -> &[String] {
        self.entries
            .get(&(normalize_class(class), method.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First marker on `class::method` that the mapping knows, with its topic.
    pub fn resolve<'m>(
        &self,
        class: &str,
        method: &str,
        mapping: &'m TopicMapping,
    ) -> Option<(String, &'m TopicId)> {
        self.markers(class, method)
            .iter()
            .find_map(|marker| mapping.get(marker).map(|topic| (marker.clone(), topic)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_class(class: &str) -> String {
    class.trim().trim_start_matches('\\').to_string()
}
