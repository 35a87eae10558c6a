//! Local Ollama daemon provider (`/api/chat`).

use std::{env, fmt, time::Duration};

use async_trait::async_trait;
use futures::stream;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Request, Uri};
use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;
use crate::http::{HttpsClient, build_https_client, endpoint, sanitize_base_url, send};
use crate::request::{
    FunctionTool, InferenceChunk, InferenceRequest, MessageRole, PromptMessage, ToolCall,
};
use crate::traits::{AdapterError, AdapterMetadata, AdapterResult, AdapterStream, ModelAdapter};

/// Provider id the built-in registry uses.
pub const OLLAMA_PROVIDER_ID: &str = "ollama";
/// Environment variable overriding the daemon URL.
pub const OLLAMA_BASE_URL_ENV: &str = "OLLAMA_BASE_URL";

/// Settings for [`OllamaAdapter`].
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    provider_id: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl OllamaConfig {
    /// Creates a configuration for `model` against `http://127.0.0.1:11434/`.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            provider_id: OLLAMA_PROVIDER_ID.to_owned(),
            base_url: "http://127.0.0.1:11434/".to_owned(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
            timeout: Duration::from_secs(120),
        }
    }

    /// Derives settings from a provider configuration, honouring
    /// `OLLAMA_BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the override URL is invalid.
    pub fn from_provider_config(config: &ProviderConfig) -> AdapterResult<Self> {
        let mut cfg = Self::new(config.model.clone());
        cfg.provider_id.clone_from(&config.provider);
        cfg.temperature = config.temperature;
        cfg.max_tokens = config.max_tokens;

        match env::var(OLLAMA_BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => cfg.with_base_url(url),
            _ => Ok(cfg),
        }
    }

    /// Overrides the daemon base URL.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> AdapterResult<Self> {
        self.base_url = sanitize_base_url("Ollama", base_url.as_ref())?;
        Ok(self)
    }

    /// Sets the default sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the HTTP timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for a local Ollama daemon.
pub struct OllamaAdapter {
    client: HttpsClient,
    endpoint: Uri,
    metadata: AdapterMetadata,
    timeout: Duration,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl fmt::Debug for OllamaAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaAdapter")
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OllamaAdapter {
    /// Constructs a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the endpoint is invalid.
    pub fn new(config: OllamaConfig) -> AdapterResult<Self> {
        Ok(Self {
            client: build_https_client(),
            endpoint: endpoint("Ollama", &config.base_url, "api/chat")?,
            metadata: AdapterMetadata::new(config.provider_id, config.model),
            timeout: config.timeout,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn build_request(&self, request: &InferenceRequest) -> ChatRequest {
        let system = request.system_prompt().map(|prompt| ChatMessage {
            role: "system".to_owned(),
            content: prompt.to_owned(),
        });
        let messages = system
            .into_iter()
            .chain(request.messages().iter().map(map_prompt_message))
            .collect();

        let temperature = request.temperature().or(self.temperature);
        let num_predict = request.max_output_tokens().or(self.max_tokens);
        let options = (temperature.is_some() || num_predict.is_some()).then_some(ChatOptions {
            temperature,
            num_predict,
        });

        ChatRequest {
            model: self.metadata.model().to_owned(),
            stream: false,
            messages,
            options,
            tools: request.function_tools(),
        }
    }
}

#[async_trait]
impl ModelAdapter for OllamaAdapter {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream> {
        let body = serde_json::to_vec(&self.build_request(&request)).map_err(|err| {
            AdapterError::invalid_request(format!("failed to encode Ollama request: {err}"))
        })?;

        let http_request = Request::post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .map_err(|err| {
                AdapterError::transport(format!("failed to build Ollama request: {err}"))
            })?;

        let bytes = send(&self.client, http_request, self.timeout, "Ollama").await?;
        let response: ChatResponse = serde_json::from_slice(&bytes).map_err(|err| {
            AdapterError::response(format!("failed to decode Ollama response: {err}"))
        })?;

        let chunk = response.into_chunk()?;
        Ok(Box::pin(stream::once(async move { Ok(chunk) })))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    stream: bool,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<FunctionTool>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ReplyMessage>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ReplyToolCall>,
}

// Unlike OpenAI, Ollama sends `arguments` as a JSON object.
#[derive(Debug, Deserialize)]
struct ReplyToolCall {
    function: ReplyFunction,
}

#[derive(Debug, Deserialize)]
struct ReplyFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

impl ChatResponse {
    fn into_chunk(self) -> AdapterResult<InferenceChunk> {
        if let Some(error) = self.error {
            return Err(AdapterError::response(error));
        }
        let Some(message) = self.message else {
            return Ok(InferenceChunk::new(self.response.unwrap_or_default(), true));
        };
        let calls = message
            .tool_calls
            .into_iter()
            .map(|call| ToolCall {
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();
        Ok(InferenceChunk::new(message.content, true).with_tool_calls(calls))
    }
}

// Ollama has no tool role; tool output is replayed as user content.
fn map_prompt_message(message: &PromptMessage) -> ChatMessage {
    match message.role() {
        MessageRole::Tool => ChatMessage {
            role: "user".to_owned(),
            content: format!("[tool output] {}", message.content()),
        },
        role => ChatMessage {
            role: role.to_string(),
            content: message.content().to_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ToolDeclaration;

    #[test]
    fn provider_config_carries_tuning() {
        let config = ProviderConfig::new("ollama", "llama3").with_max_tokens(64);
        let adapter = OllamaAdapter::new(
            OllamaConfig::from_provider_config(&config)
                .unwrap()
                .with_base_url("http://localhost:11434")
                .unwrap(),
        )
        .unwrap();

        let request = InferenceRequest::new(vec![PromptMessage::new(MessageRole::User, "hello")])
            .unwrap()
            .with_system_prompt("terse");
        let chat = adapter.build_request(&request);

        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.options.as_ref().and_then(|o| o.num_predict), Some(64));
        assert_eq!(adapter.metadata().provider(), "ollama");
    }

    #[test]
    fn options_omitted_without_tuning() {
        let adapter = OllamaAdapter::new(OllamaConfig::new("gemma")).unwrap();
        let request =
            InferenceRequest::new(vec![PromptMessage::new(MessageRole::User, "hi")]).unwrap();
        assert!(adapter.build_request(&request).options.is_none());
    }

    #[test]
    fn tool_messages_become_user_messages() {
        let mapped = map_prompt_message(&PromptMessage::new(MessageRole::Tool, "output"));
        assert_eq!(mapped.role, "user");
        assert!(mapped.content.contains("tool output"));
    }

    #[test]
    fn chat_response_prefers_message() {
        let json = r#"{ "message": {"role": "assistant", "content": "hi"}, "response": "ignored" }"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.into_chunk().unwrap().delta, "hi");
    }

    #[test]
    fn generate_style_responses_fall_back_to_response_text() {
        let parsed: ChatResponse = serde_json::from_str(r#"{ "response": "legacy" }"#).unwrap();
        assert_eq!(parsed.into_chunk().unwrap().delta, "legacy");
    }

    #[test]
    fn error_bodies_become_response_errors() {
        let parsed: ChatResponse = serde_json::from_str(r#"{ "error": "model not found" }"#).unwrap();
        let err = parsed.into_chunk().expect_err("error body");
        assert!(matches!(err, AdapterError::Response { ref reason } if reason == "model not found"));
    }

    #[test]
    fn tools_round_out_the_chat_request() {
        let adapter = OllamaAdapter::new(OllamaConfig::new("qwen3")).unwrap();
        let request = InferenceRequest::new(vec![PromptMessage::new(MessageRole::User, "env?")])
            .unwrap()
            .with_tools([ToolDeclaration::qualified("env", "get_env", "Read a variable")]);

        let json = serde_json::to_value(adapter.build_request(&request)).unwrap();
        assert_eq!(json["tools"][0]["function"]["name"], "env__get_env");

        let reply = r#"{ "message": { "role": "assistant", "content": "",
            "tool_calls": [ { "function": { "name": "env__get_env", "arguments": { "name": "HOME" } } } ] } }"#;
        let chunk = serde_json::from_str::<ChatResponse>(reply).unwrap().into_chunk().unwrap();
        assert_eq!(chunk.tool_calls.len(), 1);
        assert_eq!(chunk.tool_calls[0].arguments["name"], "HOME");
    }
}
