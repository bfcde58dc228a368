use std::path::PathBuf;
use thiserror::Error;

/// Core error type for resmod operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read options at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse options at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A derived attribute was read before one of its dependencies was set.
    #[error("expected `{missing}` to be set, cannot compute `{attribute}`")]
    MissingAttribute {
        missing: &'static str,
        attribute: &'static str,
    },

    /// An attribute's producer (transitively) read the attribute itself.
    #[error("attribute `{attribute}` depends on itself")]
    AttributeCycle { attribute: &'static str },

    /// The companion module is required but could not be found.
    #[error("expected {module} to be installed locally for {name}")]
    CompanionNotFound { module: String, name: String },

    /// The companion module is required but failed to load.
    #[error("failed to load {module} for {name}: {reason}")]
    CompanionLoad {
        module: String,
        name: String,
        reason: String,
    },

    #[error("one of config_name, config_names or config_file must be defined")]
    MissingConfigName,

    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// True for strict-mode companion failures.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        matches!(
            self,
            Self::CompanionNotFound { .. } | Self::CompanionLoad { .. }
        )
    }
}

/// Result type alias for resmod operations.
pub type Result<T> = std::result::Result<T, Error>;
