//! Runtime settings from a JSON file and `AGENT_*` environment variables.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agent_primitives::TargetTag;
use agent_runtime::{
    BrowserAdapter, CloudAdapter, HttpRemoteTransport, ModelOverrides, NodeAdapter,
    RuntimeAdapter, RuntimeOptions, UniversalRuntime,
};
use agent_tools::ToolPluginRegistry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Execution target (`node`, `browser`, `cloud`).
pub const ENV_TARGET: &str = "AGENT_TARGET";
/// Profile name.
pub const ENV_PROFILE: &str = "AGENT_PROFILE";
/// Provider id overriding the profile's.
pub const ENV_PROVIDER: &str = "AGENT_PROVIDER";
/// Model overriding the profile's.
pub const ENV_MODEL: &str = "AGENT_MODEL";
/// Sampling temperature overriding the profile's.
pub const ENV_TEMPERATURE: &str = "AGENT_TEMPERATURE";
/// Free-form workspace context.
pub const ENV_WORKSPACE_CONTEXT: &str = "AGENT_WORKSPACE_CONTEXT";
/// Working directory for the session.
pub const ENV_WORKING_DIR: &str = "AGENT_WORKING_DIR";
/// Any of `1`, `true`, `yes`, `on` disables MCP discovery.
pub const ENV_DISABLE_MCP: &str = "AGENT_DISABLE_MCP";
/// Base URL of the remote execution surface (cloud target).
pub const ENV_REMOTE_URL: &str = "AGENT_REMOTE_URL";
/// Bearer token for the remote execution surface.
pub const ENV_REMOTE_TOKEN: &str = "AGENT_REMOTE_TOKEN";

/// Host-level settings. Every field is optional in JSON; missing ones take
/// their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeSettings {
    /// Execution target. `universal` is not a valid host target.
    pub target: TargetTag,
    /// Profile to resolve.
    pub profile: Option<String>,
    /// Provider override.
    pub provider: Option<String>,
    /// Model override.
    pub model: Option<String>,
    /// Temperature override.
    pub temperature: Option<f32>,
    /// Workspace context string.
    pub workspace_context: Option<String>,
    /// Working directory; defaults to the process's.
    pub working_dir: Option<PathBuf>,
    /// Skip MCP discovery on the node target.
    pub disable_mcp: bool,
    /// Remote surface URL for the cloud target.
    pub remote_url: Option<String>,
    /// Remote surface bearer token.
    #[serde(skip_serializing)]
    pub remote_token: Option<String>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            target: TargetTag::Node,
            profile: None,
            provider: None,
            model: None,
            temperature: None,
            workspace_context: None,
            working_dir: None,
            disable_mcp: false,
            remote_url: None,
            remote_token: None,
        }
    }
}

impl RuntimeSettings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Fails when a variable holds an unusable value.
    pub fn from_env() -> ConfigResult<Self> {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// Reads a JSON settings file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "runtime settings loaded");
        Ok(settings)
    }

    /// Reads `path` when given, then applies the environment on top.
    ///
    /// # Errors
    ///
    /// Propagates file and environment failures.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.overlay(|name| std::env::var(name).ok())
    }

    /// Applies variables from `lookup` over the current values. Blank values
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Fails when the target, temperature, or MCP flag does not parse.
    pub fn overlay<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        if let Some(value) = read(ENV_TARGET) {
            self.target = value
                .parse()
                .map_err(|err: agent_primitives::Error| ConfigError::invalid(ENV_TARGET, &value, err.to_string()))?;
        }
        if let Some(value) = read(ENV_TEMPERATURE) {
            let temperature = value
                .parse::<f32>()
                .map_err(|err| ConfigError::invalid(ENV_TEMPERATURE, &value, err.to_string()))?;
            self.temperature = Some(temperature);
        }
        if let Some(value) = read(ENV_DISABLE_MCP) {
            self.disable_mcp = parse_flag(ENV_DISABLE_MCP, &value)?;
        }

        for (name, slot) in [
            (ENV_PROFILE, &mut self.profile),
            (ENV_PROVIDER, &mut self.provider),
            (ENV_MODEL, &mut self.model),
            (ENV_WORKSPACE_CONTEXT, &mut self.workspace_context),
            (ENV_REMOTE_URL, &mut self.remote_url),
            (ENV_REMOTE_TOKEN, &mut self.remote_token),
        ] {
            if let Some(value) = read(name) {
                *slot = Some(value);
            }
        }
        if let Some(value) = read(ENV_WORKING_DIR) {
            self.working_dir = Some(PathBuf::from(value));
        }
        Ok(self)
    }

    /// Session options derived from these settings.
    #[must_use]
    pub fn runtime_options(&self) -> RuntimeOptions {
        let mut options = RuntimeOptions::new();
        if let Some(profile) = &self.profile {
            options = options.with_profile(profile.clone());
        }
        if let Some(context) = &self.workspace_context {
            options = options.with_workspace_context(context.clone());
        }
        if let Some(dir) = &self.working_dir {
            options = options.with_working_dir(dir.clone());
        }
        options
    }

    /// Model overrides derived from these settings.
    #[must_use]
    pub fn model_overrides(&self) -> ModelOverrides {
        ModelOverrides {
            provider: self.provider.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            ..ModelOverrides::default()
        }
    }

    /// Builds a runtime for the configured target over `plugins`.
    ///
    /// # Errors
    ///
    /// Fails for the `universal` target, and for `cloud` without a usable
    /// remote URL.
    pub fn build_runtime(&self, plugins: Arc<ToolPluginRegistry>) -> ConfigResult<UniversalRuntime> {
        let adapter: Arc<dyn RuntimeAdapter> = match self.target {
            TargetTag::Node => {
                let node = NodeAdapter::new(Arc::clone(&plugins));
                Arc::new(if self.disable_mcp { node.without_mcp() } else { node })
            }
            TargetTag::Browser => Arc::new(BrowserAdapter::default()),
            TargetTag::Cloud => {
                let url = self.remote_url.as_deref().ok_or_else(|| {
                    ConfigError::invalid(ENV_REMOTE_URL, "", "required for the cloud target")
                })?;
                let mut transport = HttpRemoteTransport::new(url)?;
                if let Some(token) = &self.remote_token {
                    transport = transport.with_bearer_token(token.clone());
                }
                Arc::new(CloudAdapter::new(Arc::new(transport)))
            }
            TargetTag::Universal => {
                return Err(ConfigError::invalid(
                    ENV_TARGET,
                    TargetTag::Universal.as_str(),
                    "pick node, browser, or cloud",
                ));
            }
        };
        debug!(target = %self.target, mcp = !self.disable_mcp, "runtime built from settings");
        Ok(UniversalRuntime::new(adapter, plugins))
    }
}

fn parse_flag(name: &str, value: &str) -> ConfigResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(name, value, "expected a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = RuntimeSettings::default()
            .overlay(lookup(&[
                (ENV_TARGET, "Browser"),
                (ENV_PROFILE, "reviewer"),
                (ENV_MODEL, "  "),
                (ENV_TEMPERATURE, "0.4"),
                (ENV_DISABLE_MCP, "yes"),
            ]))
            .unwrap();

        assert_eq!(settings.target, TargetTag::Browser);
        assert_eq!(settings.profile.as_deref(), Some("reviewer"));
        assert!(settings.model.is_none());
        assert_eq!(settings.temperature, Some(0.4));
        assert!(settings.disable_mcp);
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = RuntimeSettings::default()
            .overlay(lookup(&[(ENV_TARGET, "mainframe")]))
            .expect_err("unknown target");
        assert!(err.to_string().contains(ENV_TARGET));

        let err = RuntimeSettings::default()
            .overlay(lookup(&[(ENV_DISABLE_MCP, "maybe")]))
            .expect_err("not a flag");
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn file_then_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.json");
        std::fs::write(
            &path,
            r#"{ "target": "cloud", "profile": "coder", "remoteUrl": "https://tools.internal", "workspaceContext": "monorepo" }"#,
        )
        .unwrap();

        let settings = RuntimeSettings::from_file(&path)
            .unwrap()
            .overlay(lookup(&[(ENV_PROFILE, "reviewer")]))
            .unwrap();
        assert_eq!(settings.target, TargetTag::Cloud);
        assert_eq!(settings.profile.as_deref(), Some("reviewer"));
        assert_eq!(settings.workspace_context.as_deref(), Some("monorepo"));

        let missing = RuntimeSettings::from_file(dir.path().join("absent.json")).expect_err("missing");
        assert!(matches!(missing, ConfigError::Io { .. }));
    }

    #[test]
    fn overrides_and_options_follow_settings() {
        let settings = RuntimeSettings {
            provider: Some("ollama".into()),
            temperature: Some(0.1),
            ..RuntimeSettings::default()
        };
        let overrides = settings.model_overrides();
        assert_eq!(overrides.provider.as_deref(), Some("ollama"));
        assert_eq!(overrides.temperature, Some(0.1));
        assert!(overrides.model.is_none());
    }

    #[tokio::test]
    async fn builds_runtime_per_target() {
        let plugins = Arc::new(ToolPluginRegistry::new());

        let node = RuntimeSettings {
            disable_mcp: true,
            ..RuntimeSettings::default()
        };
        assert_eq!(node.build_runtime(Arc::clone(&plugins)).unwrap().target(), TargetTag::Node);

        let cloud_without_url = RuntimeSettings {
            target: TargetTag::Cloud,
            ..RuntimeSettings::default()
        };
        assert!(cloud_without_url.build_runtime(Arc::clone(&plugins)).is_err());

        let universal = RuntimeSettings {
            target: TargetTag::Universal,
            ..RuntimeSettings::default()
        };
        assert!(universal.build_runtime(Arc::clone(&plugins)).is_err());

        let dir = tempfile::tempdir().unwrap();
        let browser = RuntimeSettings {
            target: TargetTag::Browser,
            working_dir: Some(dir.path().to_path_buf()),
            profile: Some("coder".into()),
            ..RuntimeSettings::default()
        };
        let mut session = browser
            .build_runtime(plugins)
            .unwrap()
            .assemble(browser.runtime_options())
            .await
            .unwrap();
        assert_eq!(session.context().profile(), "coder");
        assert_eq!(session.context().working_dir(), dir.path());
        session.close().await;
    }
}
