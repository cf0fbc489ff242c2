#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use topic_detector::{DetectorConfig, MarkerRegistry, TopicDetector, TopicMapping};

/// Throwaway application tree rooted at a temp dir.
pub struct SourceTree {
    pub dir: TempDir,
}

impl SourceTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `app/<relative>` with the given content.
    pub fn write(&self, relative: &str, content: &str) -> &Self {
        let path = self.root().join("app").join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, content).expect("write source");
        self
    }
}

pub fn php_class(namespace: &str, class: &str, method: &str, marker: Option<&str>) -> String {
    let annotation = marker
        .map(|m| format!("    #[{m}]\n"))
        .unwrap_or_default();
    format!(
        "<?php\n\nnamespace {namespace};\n\nclass {class}\n{{\n    public function __construct() {{}}\n\n{annotation}    public function {method}(): void\n    {{\n    }}\n}}\n"
    )
}

pub fn mapping() -> TopicMapping {
    TopicMapping::new([
        ("Emergency", 1001_i64),
        ("Critical", 1002_i64),
        ("Important", 1003_i64),
        ("Information", 1004_i64),
        ("Debug", 1005_i64),
        ("LowPriority", 1006_i64),
    ])
    .expect("mapping")
}

/// Detector scanning `tree`, with an empty registry so only the source
/// scanner can supply markers.
pub fn scanning_detector(tree: &SourceTree) -> TopicDetector {
    TopicDetector::new(DetectorConfig {
        source_root: tree.root().to_path_buf(),
        ..DetectorConfig::with_topics(mapping())
    })
    .expect("detector")
    .with_registry(MarkerRegistry::new())
}
