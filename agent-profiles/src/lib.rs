//! Agent profiles ("blueprints") and the registry that resolves them by name.
//!
//! A blueprint bundles what an agent needs before its first turn: the system
//! prompt, the provider and model it talks to by default, an optional
//! rulebook reference, and an optional sampling temperature. Blueprints are
//! frozen once registered.

#![warn(missing_docs, clippy::pedantic)]

mod blueprint;
mod error;
mod registry;

pub use blueprint::{AgentBlueprint, AgentBlueprintBuilder};
pub use error::{ProfileError, ProfileResult};
pub use registry::ProfileRegistry;
