//! Agent profiles: a system prompt plus default provider, model, and
//! temperature.

use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, ProfileResult};

/// Immutable description of an agent persona.
///
/// # Examples
///
/// ```
/// use agent_profiles::AgentBlueprint;
///
/// let reviewer = AgentBlueprint::builder("reviewer")
///     .system_prompt("You review pull requests.")
///     .provider("openai")
///     .model("gpt-4o-mini")
///     .temperature(0.2)
///     .build()
///     .unwrap();
///
/// assert_eq!(reviewer.provider(), "openai");
/// assert_eq!(reviewer.rulebook(), None);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgentBlueprint {
    name: String,
    #[serde(alias = "systemPrompt")]
    system_prompt: String,
    provider: String,
    model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rulebook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl AgentBlueprint {
    /// Starts a builder for the named profile.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> AgentBlueprintBuilder {
        AgentBlueprintBuilder {
            name: name.into(),
            system_prompt: String::new(),
            provider: String::new(),
            model: String::new(),
            rulebook: None,
            temperature: None,
        }
    }

    /// Profile name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// System prompt handed to the model on every request.
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Default provider id.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Default model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Optional reference to a rulebook document.
    #[must_use]
    pub fn rulebook(&self) -> Option<&str> {
        self.rulebook.as_deref()
    }

    /// Optional sampling temperature.
    #[must_use]
    pub const fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    pub(crate) fn validate(mut self) -> ProfileResult<Self> {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            return Err(ProfileError::invalid(self.name, "profile name cannot be blank"));
        }
        self.name = trimmed.to_owned();

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ProfileError::invalid(
                    self.name,
                    format!("temperature {temperature} outside 0.0..=2.0"),
                ));
            }
        }
        Ok(self)
    }
}

/// Builder for [`AgentBlueprint`].
#[derive(Debug)]
pub struct AgentBlueprintBuilder {
    name: String,
    system_prompt: String,
    provider: String,
    model: String,
    rulebook: Option<String>,
    temperature: Option<f32>,
}

impl AgentBlueprintBuilder {
    /// Sets the system prompt.
    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the default provider id.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Sets the default model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the rulebook reference.
    #[must_use]
    pub fn rulebook(mut self, rulebook: impl Into<String>) -> Self {
        self.rulebook = Some(rulebook.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Validates and finalises the blueprint. The name is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Invalid`] for a blank name or an out-of-range
    /// temperature.
    pub fn build(self) -> ProfileResult<AgentBlueprint> {
        AgentBlueprint {
            name: self.name,
            system_prompt: self.system_prompt,
            provider: self.provider,
            model: self.model,
            rulebook: self.rulebook,
            temperature: self.temperature,
        }
        .validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed() {
        let blueprint = AgentBlueprint::builder("  coder ").build().unwrap();
        assert_eq!(blueprint.name(), "coder");
    }

    #[test]
    fn blank_names_rejected() {
        let err = AgentBlueprint::builder(" ").build().expect_err("blank");
        assert!(matches!(err, ProfileError::Invalid { .. }));
    }

    #[test]
    fn temperature_range_checked() {
        let err = AgentBlueprint::builder("hot")
            .temperature(3.5)
            .build()
            .expect_err("too hot");
        assert!(err.to_string().contains("3.5"));
    }

    #[test]
    fn decodes_camel_case_prompt() {
        let json = r#"{"name":"ops","systemPrompt":"Keep it running.","provider":"ollama","model":"llama3"}"#;
        let blueprint: AgentBlueprint = serde_json::from_str(json).unwrap();
        assert_eq!(blueprint.system_prompt(), "Keep it running.");
    }
}
