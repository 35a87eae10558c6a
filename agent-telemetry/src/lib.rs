//! Tracing subscriber setup for processes that host the runtime.
//!
//! Library crates only emit `tracing` events; binaries call [`init_tracing`]
//! (or [`TelemetryOptions::init`]) once at start-up to print them.

#![warn(missing_docs, clippy::pedantic)]

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "AGENT_LOG";

/// Directives used when [`LOG_ENV`] is unset or invalid.
pub const DEFAULT_DIRECTIVES: &str = "info";

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The fallback directives did not parse.
    #[error("invalid log directives `{directives}`: {reason}")]
    Directives {
        /// Offending directives.
        directives: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber was already installed.
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Subscriber settings.
#[derive(Clone, Debug)]
pub struct TelemetryOptions {
    env_var: String,
    fallback: String,
    with_target: bool,
    ansi: bool,
}

impl Default for TelemetryOptions {
    fn default() -> Self {
        Self {
            env_var: LOG_ENV.to_owned(),
            fallback: DEFAULT_DIRECTIVES.to_owned(),
            with_target: true,
            ansi: true,
        }
    }
}

impl TelemetryOptions {
    /// Reads directives from a different environment variable.
    #[must_use]
    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = name.into();
        self
    }

    /// Replaces the fallback directives.
    #[must_use]
    pub fn with_fallback(mut self, directives: impl Into<String>) -> Self {
        self.fallback = directives.into();
        self
    }

    /// Toggles the event target column.
    #[must_use]
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Toggles ANSI colours.
    #[must_use]
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.ansi = enabled;
        self
    }

    /// Builds the filter: the environment variable when it parses, otherwise
    /// the fallback.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Directives`] when the fallback is invalid.
    pub fn filter(&self) -> Result<EnvFilter, TelemetryError> {
        if let Ok(filter) = EnvFilter::try_from_env(&self.env_var) {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.fallback).map_err(|err| TelemetryError::Directives {
            directives: self.fallback.clone(),
            reason: err.to_string(),
        })
    }

    /// Installs the global fmt subscriber.
    ///
    /// # Errors
    ///
    /// Fails when the directives are invalid or a subscriber is already set.
    pub fn init(&self) -> Result<(), TelemetryError> {
        let layer = fmt::layer().with_target(self.with_target).with_ansi(self.ansi);
        tracing_subscriber::registry()
            .with(self.filter()?)
            .with(layer)
            .try_init()
            .map_err(|err| TelemetryError::AlreadyInstalled(err.to_string()))
    }
}

/// Installs the default subscriber, filtered by [`LOG_ENV`].
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_tracing() -> Result<(), TelemetryError> {
    TelemetryOptions::default().init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variable_uses_fallback() {
        let options = TelemetryOptions::default()
            .with_env_var("AGENT_TELEMETRY_TEST_UNSET")
            .with_fallback("agent_runtime=debug");
        let filter = options.filter().unwrap();
        assert!(filter.to_string().contains("agent_runtime=debug"));
    }

    #[test]
    fn invalid_fallback_is_reported() {
        let err = TelemetryOptions::default()
            .with_env_var("AGENT_TELEMETRY_TEST_UNSET")
            .with_fallback("agent_runtime=loud")
            .filter()
            .expect_err("bad directives");
        assert!(matches!(err, TelemetryError::Directives { .. }));
    }

    #[test]
    fn second_install_fails() {
        let _ = init_tracing();
        assert!(matches!(init_tracing(), Err(TelemetryError::AlreadyInstalled(_))));
    }
}
