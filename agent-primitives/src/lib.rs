//! Core shared types for the agent capability runtime.
//!
//! Everything here is host-agnostic: the same registry and context types are
//! used whether the runtime is embedded in a CLI, a browser sandbox, or a
//! remote executor.

#![warn(missing_docs, clippy::pedantic)]

mod context;
mod error;
mod ids;
pub mod registry;
mod target;

/// Per-session context handed to every capability module and plugin.
pub use context::{CapabilityContext, CapabilityContextBuilder, DEFAULT_PROFILE};
/// Error type and result alias shared across the SDK.
pub use error::{Error, Result};
/// Unique identifier for an assembled runtime session.
pub use ids::SessionId;
/// Keyed registry shared by providers, profiles, and tool plugins.
pub use registry::{DuplicatePolicy, KeyedRegistry, Targeted};
/// Execution-environment classifiers.
pub use target::{TargetSet, TargetTag};
