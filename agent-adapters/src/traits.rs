//! The model client contract every provider factory produces.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::request::{InferenceChunk, InferenceRequest};

/// Result alias used by model clients and provider factories.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Chunks produced by [`ModelAdapter::infer`].
pub type AdapterStream = Pin<Box<dyn Stream<Item = AdapterResult<InferenceChunk>> + Send>>;

/// Shared handle to a model client.
pub type ModelRef = Arc<dyn ModelAdapter>;

/// Failures raised while building or calling a model client.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The provider configuration is unusable (bad URL, missing key).
    #[error("provider misconfigured: {reason}")]
    Configuration {
        /// What is wrong.
        reason: String,
    },

    /// The request cannot be sent as built.
    #[error("request rejected before sending: {reason}")]
    InvalidRequest {
        /// What is wrong.
        reason: String,
    },

    /// The provider could not be reached.
    #[error("provider unreachable: {reason}")]
    Transport {
        /// Underlying I/O or timeout detail.
        reason: String,
    },

    /// The provider asked the caller to slow down.
    #[error("provider rate limited the request (retry after {retry_after:?})")]
    RateLimited {
        /// Delay the provider suggested, when it sent one.
        retry_after: Option<Duration>,
    },

    /// The provider answered with an error or an unreadable body.
    #[error("provider response unusable: {reason}")]
    Response {
        /// Status line or decoding failure.
        reason: String,
    },

    /// Provider registration or lookup failed.
    #[error(transparent)]
    Registry(#[from] agent_primitives::Error),
}

impl AdapterError {
    /// Builds an [`AdapterError::InvalidRequest`].
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Builds an [`AdapterError::Configuration`].
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Builds an [`AdapterError::Transport`].
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Builds an [`AdapterError::Response`].
    #[must_use]
    pub fn response(reason: impl Into<String>) -> Self {
        Self::Response {
            reason: reason.into(),
        }
    }
}

/// Which registered provider id and model a client talks to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterMetadata {
    provider: String,
    model: String,
}

impl AdapterMetadata {
    /// Pairs a provider id with a model name.
    #[must_use]
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Provider id the client was created under, which may differ from the
    /// backend it speaks to.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Model name sent with every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// LLM client produced by a provider factory.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Provider and model this client was built for.
    fn metadata(&self) -> &AdapterMetadata;

    /// Sends one request. Backends that do not stream yield a single chunk
    /// with `done` set.
    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream>;
}

impl fmt::Debug for dyn ModelAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metadata = self.metadata();
        f.debug_struct("ModelAdapter")
            .field("provider", &metadata.provider())
            .field("model", &metadata.model())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    struct Silent(AdapterMetadata);

    #[async_trait]
    impl ModelAdapter for Silent {
        fn metadata(&self) -> &AdapterMetadata {
            &self.0
        }

        async fn infer(&self, _request: InferenceRequest) -> AdapterResult<AdapterStream> {
            Ok(Box::pin(stream::empty()))
        }
    }

    #[test]
    fn metadata_keeps_registered_provider_id() {
        let metadata = AdapterMetadata::new("local-llama", "llama3");
        assert_eq!(metadata.provider(), "local-llama");
        assert_eq!(metadata.model(), "llama3");
    }

    #[test]
    fn client_handles_debug_print_their_metadata() {
        let client: ModelRef = Arc::new(Silent(AdapterMetadata::new("edge", "tiny")));
        let rendered = format!("{client:?}");
        assert!(rendered.contains("edge"));
        assert!(rendered.contains("tiny"));
    }

    #[test]
    fn registry_errors_pass_through_unchanged() {
        let inner = agent_primitives::Error::BlankId { kind: "provider" };
        let expected = inner.to_string();
        assert_eq!(AdapterError::from(inner).to_string(), expected);
    }
}
