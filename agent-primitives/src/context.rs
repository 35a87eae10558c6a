//! Per-session capability context.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Profile name used when a session does not select one.
pub const DEFAULT_PROFILE: &str = "default";

/// Data every capability module and tool plugin receives when a session is
/// assembled. It is built once and passed unchanged to every call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityContext {
    profile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    workspace_context: Option<String>,
    working_dir: PathBuf,
    #[serde(default)]
    env: BTreeMap<String, String>,
}

impl CapabilityContext {
    /// Starts building a context rooted at `working_dir`.
    #[must_use]
    pub fn builder(working_dir: impl Into<PathBuf>) -> CapabilityContextBuilder {
        CapabilityContextBuilder {
            profile: None,
            workspace_context: None,
            working_dir: working_dir.into(),
            env: BTreeMap::new(),
        }
    }

    /// Returns the selected profile name.
    #[must_use]
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Returns the optional free-form workspace context string.
    #[must_use]
    pub fn workspace_context(&self) -> Option<&str> {
        self.workspace_context.as_deref()
    }

    /// Returns the session working directory.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Returns the session environment mapping.
    #[must_use]
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Looks up a single environment variable.
    #[must_use]
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    /// Resolves `path` against the working directory unless it is absolute.
    #[must_use]
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

/// Builder for [`CapabilityContext`].
#[derive(Debug)]
pub struct CapabilityContextBuilder {
    profile: Option<String>,
    workspace_context: Option<String>,
    working_dir: PathBuf,
    env: BTreeMap<String, String>,
}

impl CapabilityContextBuilder {
    /// Sets the profile name. Blank names fall back to [`DEFAULT_PROFILE`].
    #[must_use]
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Sets the workspace context string.
    #[must_use]
    pub fn workspace_context(mut self, context: impl Into<String>) -> Self {
        self.workspace_context = Some(context.into());
        self
    }

    /// Replaces the environment mapping.
    #[must_use]
    pub fn env(mut self, env: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env = env.into_iter().collect();
        self
    }

    /// Adds a single environment variable.
    #[must_use]
    pub fn env_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Finalises the context.
    #[must_use]
    pub fn build(self) -> CapabilityContext {
        let profile = self
            .profile
            .map(|p| p.trim().to_owned())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_owned());

        CapabilityContext {
            profile,
            workspace_context: self.workspace_context,
            working_dir: self.working_dir,
            env: self.env,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_profile_uses_default() {
        let ctx = CapabilityContext::builder("/tmp").profile("  ").build();
        assert_eq!(ctx.profile(), DEFAULT_PROFILE);
    }

    #[test]
    fn resolves_relative_paths() {
        let ctx = CapabilityContext::builder("/work")
            .env_var("HOME", "/home/dev")
            .build();
        assert_eq!(ctx.resolve_path("src/lib.rs"), PathBuf::from("/work/src/lib.rs"));
        assert_eq!(ctx.resolve_path("/etc/hosts"), PathBuf::from("/etc/hosts"));
        assert_eq!(ctx.env_var("HOME"), Some("/home/dev"));
    }
}
