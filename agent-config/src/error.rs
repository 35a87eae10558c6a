use std::path::PathBuf;

use agent_runtime::RuntimeError;
use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or applying settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read settings file {}: {source}", path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for [`RuntimeSettings`](crate::RuntimeSettings).
    #[error("failed to parse settings file {}: {source}", path.display())]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A setting holds a value that cannot be used.
    #[error("invalid value `{value}` for {name}: {reason}")]
    Invalid {
        /// Variable or field name.
        name: String,
        /// Offending value.
        value: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Building a runtime component failed.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl ConfigError {
    pub(crate) fn invalid(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Invalid {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
