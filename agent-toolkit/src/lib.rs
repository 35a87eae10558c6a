//! Capability assembly runtime for tool-using agents.
//!
//! Depend on this crate via `cargo add agent-toolkit`. It bundles the
//! workspace crates behind feature flags so hosts only compile what they use;
//! `runtime` pulls in everything session assembly needs.

#![warn(missing_docs, clippy::pedantic)]

/// Target tags, capability context, and the keyed registry.
pub use agent_primitives as primitives;

/// Tools, capability modules, and the plugin registry (enabled by `tools` feature).
#[cfg(feature = "tools")]
pub use agent_tools as tools;

/// Model providers and their registry (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use agent_adapters as adapters;

/// Agent profiles (enabled by `profiles` feature).
#[cfg(feature = "profiles")]
pub use agent_profiles as profiles;

/// Model Context Protocol bridge (enabled by `mcp` feature).
#[cfg(feature = "mcp")]
pub use agent_mcp as mcp;

/// Runtime adapters and session assembly (enabled by `runtime` feature).
#[cfg(feature = "runtime")]
pub use agent_runtime as runtime;

/// Tracing subscriber setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use agent_telemetry as telemetry;

/// Runtime settings (enabled by `config` feature).
#[cfg(feature = "config")]
pub use agent_config as config;
