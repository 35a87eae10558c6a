//! Profile validation and lookup errors.

use thiserror::Error;

/// Result alias for profile operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Errors raised while building or resolving profiles.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// A blueprint field failed validation.
    #[error("invalid profile `{name}`: {reason}")]
    Invalid {
        /// Profile name as supplied.
        name: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Registration or lookup failed.
    #[error(transparent)]
    Registry(#[from] agent_primitives::Error),

    /// A profile document could not be decoded.
    #[error("failed to decode profiles: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ProfileError {
    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
