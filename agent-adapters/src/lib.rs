//! LLM provider registry and the model clients it builds.
//!
//! Providers are registered by id with a [`ProviderFactory`] that turns a
//! [`ProviderConfig`] into a [`ModelAdapter`]. The built-in set covers
//! OpenAI-compatible chat completions and a local Ollama daemon; hosts add
//! their own providers through [`ProviderRegistry::register`].

#![warn(missing_docs, clippy::pedantic)]

pub mod config;
pub mod http;
pub mod ollama;
pub mod openai;
pub mod registry;
pub mod request;
pub mod traits;

pub use config::{ProviderConfig, ReasoningEffort, TextVerbosity};
pub use registry::{ProviderFactory, ProviderRegistry};
pub use request::{
    InferenceChunk, InferenceRequest, MessageRole, PromptMessage, ToolCall, ToolDeclaration,
};
pub use traits::{AdapterError, AdapterMetadata, AdapterResult, AdapterStream, ModelAdapter, ModelRef};
