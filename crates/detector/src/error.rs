use thiserror::Error;

/// Result type for detector construction and configuration
pub type Result<T> = std::result::Result<T, DetectorError>;

/// Errors surfaced to the caller.
///
/// Detection itself never fails: every miss during resolution degrades to
/// "no topic". Only building a detector or loading its configuration can
/// produce one of these.
#[derive(Error, Debug)]
pub enum DetectorError {
    /// The marker → topic table has the wrong shape
    #[error("Invalid topic mapping: {0}")]
    InvalidMapping(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DetectorError {
    /// Create an invalid mapping error
    pub fn invalid_mapping(msg: impl Into<String>) -> Self {
        Self::InvalidMapping(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Why the path guard refused a candidate source path.
#[derive(Error, Debug)]
pub enum GuardRejection {
    #[error("path '{0}' contains traversal segments")]
    Traversal(String),

    #[error("path '{0}' resolves outside the authorized root")]
    OutsideRoot(String),

    #[error("path '{path}' cannot be resolved: {source}")]
    Unresolvable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why the source scanner produced no marker.
///
/// The orchestrator treats every variant as "no topic"; the distinction only
/// feeds diagnostics.
#[derive(Error, Debug)]
pub enum ScanMiss {
    #[error("rejected by path guard: {0}")]
    Rejected(#[from] GuardRejection),

    #[error("class '{0}' does not map to a source path")]
    Unmapped(String),

    #[error("failed to read '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is {size} bytes (limit {limit})")]
    TooLarge { path: String, size: u64, limit: u64 },

    #[error("method '{0}' not declared in source")]
    NoMethod(String),

    #[error("no annotation precedes method '{0}'")]
    NoAnnotation(String),
}

impl ScanMiss {
    /// Traversal and out-of-root paths are logged louder than ordinary
    /// misses. A path that does not exist is an ordinary miss.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Rejected(GuardRejection::Traversal(_) | GuardRejection::OutsideRoot(_))
        )
    }
}
