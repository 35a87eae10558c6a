use agent_adapters::AdapterError;
use agent_profiles::ProfileError;
use agent_tools::{CapabilityError, ToolError};
use thiserror::Error;

/// Result alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors surfaced by adapters, the composition root, and session bootstrap.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The working directory could not be determined.
    #[error("failed to resolve working directory: {0}")]
    WorkingDir(#[source] std::io::Error),

    /// A capability module or plugin failed.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// A tool failed.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// A model provider could not be resolved or built.
    #[error(transparent)]
    Provider(#[from] AdapterError),

    /// A profile could not be resolved.
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// The remote execution surface misbehaved.
    #[error("remote execution error: {reason}")]
    Remote {
        /// Human-readable reason.
        reason: String,
    },
}

impl RuntimeError {
    /// Convenience constructor for remote failures.
    #[must_use]
    pub fn remote(reason: impl Into<String>) -> Self {
        Self::Remote {
            reason: reason.into(),
        }
    }
}
