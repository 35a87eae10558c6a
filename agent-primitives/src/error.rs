//! Shared error definitions for agent primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the agent runtime.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating primitive types and registries.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided session identifier could not be parsed.
    #[error("invalid session id: {source}")]
    InvalidSessionId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// A registry key was empty or whitespace only.
    #[error("{kind} id cannot be blank")]
    BlankId {
        /// Kind of entry being registered (e.g. "provider").
        kind: &'static str,
    },

    /// A registry key collided with an existing entry.
    #[error("{kind} `{id}` is already registered; pass an explicit override to replace it")]
    Conflict {
        /// Kind of entry being registered.
        kind: &'static str,
        /// The existing identifier.
        id: String,
    },

    /// A registry lookup found nothing under the requested key.
    #[error("unknown {kind} `{id}`; registered: [{}]", known.join(", "))]
    NotFound {
        /// Kind of entry being looked up.
        kind: &'static str,
        /// The requested identifier.
        id: String,
        /// Sorted list of identifiers currently registered.
        known: Vec<String>,
    },

    /// A target tag string did not name a known execution environment.
    #[error("unknown target `{value}`; expected one of node, browser, cloud, universal")]
    InvalidTarget {
        /// The offending input.
        value: String,
    },
}
