//! Runtime settings for processes that host agent sessions.
//!
//! [`RuntimeSettings`] is read from a JSON file, from `AGENT_*` environment
//! variables, or both (environment wins). It then builds the pieces a host
//! needs: a [`UniversalRuntime`](agent_runtime::UniversalRuntime) for the
//! configured target, the session's
//! [`RuntimeOptions`](agent_runtime::RuntimeOptions), and the
//! [`ModelOverrides`](agent_runtime::ModelOverrides) for profile resolution.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod settings;

pub use error::{ConfigError, ConfigResult};
pub use settings::{
    ENV_DISABLE_MCP, ENV_MODEL, ENV_PROFILE, ENV_PROVIDER, ENV_REMOTE_TOKEN, ENV_REMOTE_URL,
    ENV_TARGET, ENV_TEMPERATURE, ENV_WORKING_DIR, ENV_WORKSPACE_CONTEXT, RuntimeSettings,
};
