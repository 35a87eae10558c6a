//! Provider-agnostic model configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::traits::AdapterError;

macro_rules! level_enum {
    ($(#[$meta:meta])* $name:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            /// Lowest setting.
            Low,
            /// Provider default in most APIs.
            Medium,
            /// Highest setting.
            High,
        }

        impl $name {
            /// Returns the lowercase wire value.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    Self::Low => "low",
                    Self::Medium => "medium",
                    Self::High => "high",
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AdapterError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_ascii_lowercase().as_str() {
                    "low" => Ok(Self::Low),
                    "medium" => Ok(Self::Medium),
                    "high" => Ok(Self::High),
                    other => Err(AdapterError::configuration(format!(
                        concat!("unsupported ", $what, " `{}` (expected low, medium, or high)"),
                        other
                    ))),
                }
            }
        }
    };
}

level_enum!(
    /// How much hidden reasoning a reasoning-capable model should spend.
    ReasoningEffort,
    "reasoning effort"
);

level_enum!(
    /// Requested verbosity of generated text.
    TextVerbosity,
    "text verbosity"
);

/// Everything a provider factory needs to build a model client. The registry
/// forwards it untouched; validation is the factory's job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProviderConfig {
    /// Registered provider id.
    pub provider: String,
    /// Model identifier understood by the provider.
    pub model: String,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Output token budget.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "maxTokens")]
    pub max_tokens: Option<u32>,
    /// Reasoning effort hint.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "reasoningEffort"
    )]
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Text verbosity hint.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "textVerbosity"
    )]
    pub text_verbosity: Option<TextVerbosity>,
}

impl ProviderConfig {
    /// Creates a configuration for `provider` / `model` with no tuning.
    #[must_use]
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
            reasoning_effort: None,
            text_verbosity: None,
        }
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the output token budget.
    #[must_use]
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Sets the reasoning effort hint.
    #[must_use]
    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    /// Sets the text verbosity hint.
    #[must_use]
    pub fn with_text_verbosity(mut self, verbosity: TextVerbosity) -> Self {
        self.text_verbosity = Some(verbosity);
        self
    }
}
