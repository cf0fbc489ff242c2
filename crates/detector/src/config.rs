use crate::error::{DetectorError, Result};
use crate::mapping::TopicMapping;
use crate::scanner::SourceLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for topic detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Authorized root for source scanning; nothing outside it is read
    pub source_root: PathBuf,

    /// Root namespace of application code
    pub app_namespace: String,

    /// Directory holding the application namespace, relative to `source_root`
    pub app_directory: String,

    /// Source file extension (without the dot)
    pub source_extension: String,

    /// Files larger than this are never scanned
    pub max_source_bytes: u64,

    /// Namespace prefix identifying queued job classes
    pub jobs_namespace: String,

    /// Namespace prefix identifying console command classes
    pub commands_namespace: String,

    /// Entry method of jobs and commands
    pub handle_method: String,

    /// Namespace under which component classes are synthesized
    pub component_namespace: String,

    /// Marker → topic table
    pub topics: TopicMapping,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("."),
            app_namespace: "App".to_string(),
            app_directory: "app".to_string(),
            source_extension: "php".to_string(),
            max_source_bytes: 1024 * 1024,
            jobs_namespace: "App\\Jobs".to_string(),
            commands_namespace: "App\\Console\\Commands".to_string(),
            handle_method: "handle".to_string(),
            component_namespace: "App\\Http\\Livewire".to_string(),
            topics: TopicMapping::default(),
        }
    }
}

impl DetectorConfig {
    pub fn with_topics(topics: TopicMapping) -> Self {
        Self {
            topics,
            ..Default::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file. A relative `source_root` is resolved against the
    /// file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&raw)?;
        if config.source_root.is_relative() {
            if let Some(parent) = path.parent() {
                config.source_root = parent.join(&config.source_root);
            }
        }
        Ok(config)
    }

    pub fn layout(&self) -> SourceLayout {
        SourceLayout {
            app_namespace: self.app_namespace.clone(),
            app_directory: self.app_directory.clone(),
            extension: self.source_extension.clone(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("app_namespace", &self.app_namespace),
            ("app_directory", &self.app_directory),
            ("source_extension", &self.source_extension),
            ("jobs_namespace", &self.jobs_namespace),
            ("commands_namespace", &self.commands_namespace),
            ("handle_method", &self.handle_method),
            ("component_namespace", &self.component_namespace),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(DetectorError::invalid_config(format!("{name} must not be empty")));
            }
        }

        if self.app_namespace.contains('\\') {
            return Err(DetectorError::invalid_config(
                "app_namespace must be a single namespace segment",
            ));
        }

        if self.max_source_bytes == 0 {
            return Err(DetectorError::invalid_config("max_source_bytes must be > 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::TopicId;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_valid() {
        assert!(DetectorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = DetectorConfig::default();

        config.handle_method = "  ".to_string();
        assert!(config.validate().is_err());

        config.handle_method = "handle".to_string();
        config.max_source_bytes = 0;
        assert!(config.validate().is_err());

        config.max_source_bytes = 10;
        config.app_namespace = "App\\Core".to_string();
        assert!(config.validate().is_err());

        config.app_namespace = "App".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parses_partial_toml() {
        let config = DetectorConfig::from_toml_str(
            r#"
source_root = "/srv/app"
jobs_namespace = "Domain\\Jobs"

[topics]
Emergency = 12345
LowPriority = "quiet"
"#,
        )
        .unwrap();

        assert_eq!(config.source_root, PathBuf::from("/srv/app"));
        assert_eq!(config.jobs_namespace, "Domain\\Jobs");
        assert_eq!(config.handle_method, "handle");
        assert_eq!(config.topics.get("Emergency"), Some(&TopicId::Int(12345)));
        assert_eq!(config.topics.get("LowPriority"), Some(&TopicId::from("quiet")));
    }

    #[test]
    fn test_invalid_topic_value_is_rejected() {
        let err = DetectorConfig::from_toml_str("[topics]\nEmergency = true\n").unwrap_err();
        assert!(matches!(err, DetectorError::ConfigParse(_)), "{err}");
    }

    #[test]
    fn test_load_resolves_relative_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("topics.toml");
        std::fs::write(&path, "source_root = \"src-tree\"\n").unwrap();

        let config = DetectorConfig::load(&path).unwrap();
        assert_eq!(config.source_root, dir.path().join("src-tree"));
    }
}
