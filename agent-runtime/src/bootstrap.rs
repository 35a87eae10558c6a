//! Resolves a profile into a ready model client.

use std::fmt;
use std::sync::Arc;

use agent_adapters::{
    InferenceRequest, ModelRef, PromptMessage, ProviderConfig, ProviderRegistry, ReasoningEffort,
    TextVerbosity,
};
use agent_profiles::{AgentBlueprint, ProfileRegistry};
use tracing::info;

use crate::error::RuntimeResult;

/// Per-session values that win over the profile's defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelOverrides {
    /// Provider id.
    pub provider: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Output token budget.
    pub max_tokens: Option<u32>,
    /// Reasoning effort hint.
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Text verbosity hint.
    pub text_verbosity: Option<TextVerbosity>,
}

impl ModelOverrides {
    /// Overrides the provider id.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Overrides the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Overrides the temperature.
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

    fn apply(&self, profile: &AgentBlueprint) -> ProviderConfig {
        let provider = non_blank(self.provider.as_deref()).unwrap_or(profile.provider());
        let model = non_blank(self.model.as_deref()).unwrap_or(profile.model());

        ProviderConfig {
            provider: provider.trim().to_owned(),
            model: model.trim().to_owned(),
            temperature: self.temperature.or(profile.temperature()),
            max_tokens: self.max_tokens,
            reasoning_effort: self.reasoning_effort,
            text_verbosity: self.text_verbosity,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// A profile paired with the client built for it.
#[derive(Clone)]
pub struct BootstrappedModel {
    profile: Arc<AgentBlueprint>,
    config: ProviderConfig,
    client: ModelRef,
}

impl fmt::Debug for BootstrappedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrappedModel")
            .field("profile", &self.profile.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BootstrappedModel {
    /// Returns the resolved profile.
    #[must_use]
    pub fn profile(&self) -> &Arc<AgentBlueprint> {
        &self.profile
    }

    /// Returns the configuration the client was built from.
    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Returns the model client.
    #[must_use]
    pub fn client(&self) -> &ModelRef {
        &self.client
    }

    /// Builds a request carrying the profile's system prompt and the resolved
    /// sampling settings.
    ///
    /// # Errors
    ///
    /// Fails when `messages` is empty.
    pub fn request(&self, messages: Vec<PromptMessage>) -> RuntimeResult<InferenceRequest> {
        let mut request = InferenceRequest::new(messages)?;
        if !self.profile.system_prompt().trim().is_empty() {
            request = request.with_system_prompt(self.profile.system_prompt());
        }
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(tokens) = self.config.max_tokens {
            request = request.with_max_output_tokens(tokens);
        }
        Ok(request)
    }
}

/// Looks up profiles and builds their model clients.
#[derive(Clone, Debug)]
pub struct SessionBootstrap {
    profiles: Arc<ProfileRegistry>,
    providers: Arc<ProviderRegistry>,
}

impl SessionBootstrap {
    /// Creates a bootstrapper over shared registries.
    #[must_use]
    pub fn new(profiles: Arc<ProfileRegistry>, providers: Arc<ProviderRegistry>) -> Self {
        Self { profiles, providers }
    }

    /// Returns the profile registry.
    #[must_use]
    pub fn profiles(&self) -> &Arc<ProfileRegistry> {
        &self.profiles
    }

    /// Returns the provider registry.
    #[must_use]
    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    /// Resolves `profile`, overlays `overrides`, and builds the client.
    ///
    /// # Errors
    ///
    /// Fails when the profile or provider is unknown (listing the registered
    /// names) or when the provider factory rejects the configuration.
    pub fn resolve(&self, profile: &str, overrides: &ModelOverrides) -> RuntimeResult<BootstrappedModel> {
        let blueprint = self.profiles.get(profile)?;
        let config = overrides.apply(&blueprint);
        let client = self.providers.create(&config)?;
        info!(
            profile = %blueprint.name(),
            provider = %config.provider,
            model = %config.model,
            "session model resolved"
        );

        Ok(BootstrappedModel {
            profile: blueprint,
            config,
            client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use agent_adapters::{
        AdapterMetadata, AdapterResult, AdapterStream, InferenceChunk, MessageRole, ModelAdapter,
        ProviderFactory,
    };
    use async_trait::async_trait;
    use futures::stream;

    struct Echo {
        metadata: AdapterMetadata,
    }

    #[async_trait]
    impl ModelAdapter for Echo {
        fn metadata(&self) -> &AdapterMetadata {
            &self.metadata
        }

        async fn infer(&self, _request: InferenceRequest) -> AdapterResult<AdapterStream> {
            Ok(Box::pin(stream::once(async { Ok(InferenceChunk::new("ok", true)) })))
        }
    }

    fn bootstrap() -> SessionBootstrap {
        let profiles = ProfileRegistry::new();
        profiles
            .register(
                AgentBlueprint::builder("coder")
                    .system_prompt("You write Rust.")
                    .provider("local")
                    .model("small")
                    .temperature(0.2)
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let providers = ProviderRegistry::new();
        for id in ["local", "remote"] {
            providers
                .register(
                    id,
                    ProviderFactory::new(|config| {
                        Ok(Arc::new(Echo {
                            metadata: AdapterMetadata::new(config.provider.clone(), config.model.clone()),
                        }) as ModelRef)
                    }),
                    false,
                )
                .unwrap();
        }
        SessionBootstrap::new(Arc::new(profiles), Arc::new(providers))
    }

    #[test]
    fn profile_defaults_apply() {
        let model = bootstrap().resolve(" coder ", &ModelOverrides::default()).unwrap();
        assert_eq!(model.client().metadata().provider(), "local");
        assert_eq!(model.client().metadata().model(), "small");
        assert_eq!(model.config().temperature, Some(0.2));

        let request = model
            .request(vec![PromptMessage::new(MessageRole::User, "hi")])
            .unwrap();
        assert_eq!(request.system_prompt(), Some("You write Rust."));
        assert_eq!(request.temperature(), Some(0.2));
    }

    #[test]
    fn overrides_win_and_blank_overrides_are_ignored() {
        let overrides = ModelOverrides::default()
            .with_provider("remote")
            .with_model("  ")
            .with_temperature(0.9)
            .with_max_tokens(64);
        let model = bootstrap().resolve("coder", &overrides).unwrap();

        assert_eq!(model.config().provider, "remote");
        assert_eq!(model.config().model, "small");
        assert_eq!(model.config().temperature, Some(0.9));
        assert_eq!(model.config().max_tokens, Some(64));
    }

    #[test]
    fn unknown_names_fail_with_known_lists() {
        let err = bootstrap()
            .resolve("reviewer", &ModelOverrides::default())
            .expect_err("unknown profile");
        assert!(matches!(err, RuntimeError::Profile(_)));
        assert!(err.to_string().contains("[coder]"));

        let err = bootstrap()
            .resolve("coder", &ModelOverrides::default().with_provider("cloudy"))
            .expect_err("unknown provider");
        assert!(matches!(err, RuntimeError::Provider(_)));
        assert!(err.to_string().contains("[local, remote]"));
    }
}
