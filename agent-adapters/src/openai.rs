//! OpenAI-compatible chat completions provider.

use std::{env, fmt, time::Duration};

use async_trait::async_trait;
use futures::stream;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Body, Request, Uri};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::{ProviderConfig, ReasoningEffort, TextVerbosity};
use crate::http::{HttpsClient, build_https_client, endpoint, sanitize_base_url, send};
use crate::request::{FunctionTool, InferenceChunk, InferenceRequest, PromptMessage, ToolCall};
use crate::traits::{AdapterError, AdapterMetadata, AdapterResult, AdapterStream, ModelAdapter};

/// Provider id the built-in registry uses.
pub const OPENAI_PROVIDER_ID: &str = "openai";
/// Environment variable holding the API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment variable overriding the API base URL.
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/";

/// Settings for [`OpenAiAdapter`].
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    provider_id: String,
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    reasoning_effort: Option<ReasoningEffort>,
    verbosity: Option<TextVerbosity>,
}

impl OpenAiConfig {
    /// Creates a configuration for `model` against the public API.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            provider_id: OPENAI_PROVIDER_ID.to_owned(),
            api_key: None,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(60),
            temperature: None,
            max_tokens: None,
            reasoning_effort: None,
            verbosity: None,
        }
    }

    /// Derives settings from a provider configuration, reading the API key and
    /// optional base URL from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if `OPENAI_BASE_URL` is invalid.
    pub fn from_provider_config(config: &ProviderConfig) -> AdapterResult<Self> {
        let mut cfg = Self::new(config.model.clone());
        cfg.provider_id.clone_from(&config.provider);
        cfg.api_key = env::var(OPENAI_API_KEY_ENV).ok().filter(|key| !key.trim().is_empty());
        cfg.temperature = config.temperature;
        cfg.max_tokens = config.max_tokens;
        cfg.reasoning_effort = config.reasoning_effort;
        cfg.verbosity = config.text_verbosity;

        match env::var(OPENAI_BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => cfg.with_base_url(url),
            _ => Ok(cfg),
        }
    }

    /// Overrides the base URL used for API calls.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> AdapterResult<Self> {
        self.base_url = sanitize_base_url("OpenAI", base_url.as_ref())?;
        Ok(self)
    }

    /// Supplies an explicit API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the default sampling temperature used when requests omit it.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the reasoning effort forwarded as `reasoning_effort`.
    #[must_use]
    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    /// Sets the verbosity forwarded as `verbosity`.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: TextVerbosity) -> Self {
        self.verbosity = Some(verbosity);
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Chat completions client.
pub struct OpenAiAdapter {
    client: HttpsClient,
    endpoint: Uri,
    metadata: AdapterMetadata,
    api_key: String,
    timeout: Duration,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    reasoning_effort: Option<ReasoningEffort>,
    verbosity: Option<TextVerbosity>,
}

impl fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("provider", &self.metadata.provider())
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiAdapter {
    /// Constructs a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the API key is missing or the
    /// endpoint is invalid.
    pub fn new(config: OpenAiConfig) -> AdapterResult<Self> {
        let api_key = config.api_key.ok_or_else(|| {
            AdapterError::configuration(format!(
                "OpenAI provider requires an API key (set {OPENAI_API_KEY_ENV})"
            ))
        })?;

        Ok(Self {
            client: build_https_client(),
            endpoint: endpoint("OpenAI", &config.base_url, "v1/chat/completions")?,
            metadata: AdapterMetadata::new(config.provider_id, config.model),
            api_key,
            timeout: config.timeout,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            reasoning_effort: config.reasoning_effort,
            verbosity: config.verbosity,
        })
    }

    fn build_request(&self, request: &InferenceRequest) -> ChatCompletionRequest {
        let system = request
            .system_prompt()
            .map(|prompt| OpenAiMessage {
                role: "system".to_owned(),
                content: prompt.to_owned(),
            });
        let messages = system
            .into_iter()
            .chain(request.messages().iter().map(map_prompt_message))
            .collect();

        ChatCompletionRequest {
            model: self.metadata.model().to_owned(),
            messages,
            temperature: request.temperature().or(self.temperature),
            max_tokens: request.max_output_tokens().or(self.max_tokens),
            reasoning_effort: self.reasoning_effort,
            verbosity: self.verbosity,
            tools: request.function_tools(),
            stream: false,
        }
    }
}

#[async_trait]
impl ModelAdapter for OpenAiAdapter {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream> {
        let payload = self.build_request(&request);
        let body = serde_json::to_vec(&payload).map_err(|err| {
            AdapterError::invalid_request(format!("failed to encode OpenAI request: {err}"))
        })?;

        let http_request = Request::post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .body(Body::from(body))
            .map_err(|err| {
                AdapterError::transport(format!("failed to build OpenAI request: {err}"))
            })?;

        debug!(
            model = %payload.model,
            messages = payload.messages.len(),
            tools = payload.tools.len(),
            "sending chat completion"
        );
        let bytes = send(&self.client, http_request, self.timeout, "OpenAI").await?;

        let response: ChatCompletionResponse = serde_json::from_slice(&bytes).map_err(|err| {
            AdapterError::response(format!("failed to decode OpenAI response: {err}"))
        })?;

        let chunk = response.into_chunk();
        Ok(Box::pin(stream::once(async move { Ok(chunk) })))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<ReasoningEffort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verbosity: Option<TextVerbosity>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<FunctionTool>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    function: WireFunctionCall,
}

// `arguments` arrives as a JSON-encoded string.
#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

impl From<WireToolCall> for ToolCall {
    fn from(call: WireToolCall) -> Self {
        let raw = call.function.arguments;
        let arguments = if raw.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&raw).unwrap_or_else(|_| Value::String(raw))
        };
        Self {
            name: call.function.name,
            arguments,
        }
    }
}

impl ChatCompletionResponse {
    fn into_chunk(self) -> InferenceChunk {
        let Some(message) = self.choices.into_iter().find_map(|choice| choice.message) else {
            return InferenceChunk::new("", true);
        };
        let calls = message.tool_calls.into_iter().map(ToolCall::from).collect();
        InferenceChunk::new(message.content.unwrap_or_default(), true).with_tool_calls(calls)
    }
}

fn map_prompt_message(message: &PromptMessage) -> OpenAiMessage {
    OpenAiMessage {
        role: message.role().to_string(),
        content: message.content().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{MessageRole, ToolDeclaration};

    fn adapter(config: OpenAiConfig) -> OpenAiAdapter {
        OpenAiAdapter::new(config.with_api_key("test-key")).expect("adapter")
    }

    #[test]
    fn missing_api_key_is_configuration_error() {
        let err = OpenAiAdapter::new(OpenAiConfig::new("gpt-4o")).expect_err("no key");
        assert!(err.to_string().contains(OPENAI_API_KEY_ENV));
    }

    #[test]
    fn system_prompt_leads_the_conversation() {
        let adapter = adapter(OpenAiConfig::new("gpt-4o"));
        let request = InferenceRequest::new(vec![PromptMessage::new(MessageRole::User, "hi")])
            .unwrap()
            .with_system_prompt("You review code.");

        let chat = adapter.build_request(&request);
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[1].content, "hi");
    }

    #[test]
    fn tuning_knobs_are_forwarded() {
        let adapter = adapter(
            OpenAiConfig::new("gpt-5")
                .with_temperature(0.3)
                .with_reasoning_effort(ReasoningEffort::High)
                .with_verbosity(TextVerbosity::Low),
        );
        let request =
            InferenceRequest::new(vec![PromptMessage::new(MessageRole::User, "go")]).unwrap();

        let json = serde_json::to_value(adapter.build_request(&request)).unwrap();
        assert_eq!(json["reasoning_effort"], "high");
        assert_eq!(json["verbosity"], "low");
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["model"], "gpt-5");
    }

    #[test]
    fn response_parsing_extracts_content() {
        let json = r#"{ "choices": [ { "message": { "content": "hi" } } ] }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        let chunk = parsed.into_chunk();
        assert_eq!(chunk.delta, "hi");
        assert!(chunk.done);
        assert!(chunk.tool_calls.is_empty());
    }

    #[test]
    fn declared_tools_are_sent_as_functions() {
        let adapter = adapter(OpenAiConfig::new("gpt-4o"));
        let request = InferenceRequest::new(vec![PromptMessage::new(MessageRole::User, "ls")])
            .unwrap()
            .with_tools([ToolDeclaration::qualified("fs", "list_dir", "List a directory")]);

        let json = serde_json::to_value(adapter.build_request(&request)).unwrap();
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][0]["function"]["name"], "fs__list_dir");

        let bare = InferenceRequest::new(vec![PromptMessage::new(MessageRole::User, "hi")]).unwrap();
        let json = serde_json::to_value(adapter.build_request(&bare)).unwrap();
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn tool_calls_decode_their_argument_strings() {
        let json = r#"{ "choices": [ { "message": { "content": null, "tool_calls": [
            { "id": "c1", "type": "function",
              "function": { "name": "fs__read_file", "arguments": "{\"path\":\"a.txt\"}" } },
            { "id": "c2", "type": "function",
              "function": { "name": "env__get_env", "arguments": "" } }
        ] } } ] }"#;
        let chunk = serde_json::from_str::<ChatCompletionResponse>(json).unwrap().into_chunk();

        assert_eq!(chunk.delta, "");
        assert_eq!(chunk.tool_calls.len(), 2);
        assert_eq!(chunk.tool_calls[0].name, "fs__read_file");
        assert_eq!(chunk.tool_calls[0].arguments["path"], "a.txt");
        assert!(chunk.tool_calls[1].arguments.is_null());
    }
}
