//! Requests sent to model clients and the chunks they stream back.
//!
//! A request may declare the session's tools. Declarations use function-safe
//! names (`suite__tool`), since chat providers only accept
//! `[A-Za-z0-9_-]` in tool names; hosts map calls back through
//! [`ToolDeclaration::qualified`] on the same suite and tool ids.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::traits::{AdapterError, AdapterResult};

/// Speaker of a [`PromptMessage`].
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions from the host.
    System,
    /// Human input.
    User,
    /// Earlier model output.
    Assistant,
    /// Output of a tool the model called.
    Tool,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        };
        f.write_str(label)
    }
}

/// One conversation turn.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PromptMessage {
    role: MessageRole,
    content: String,
}

impl PromptMessage {
    /// Creates a turn spoken by `role`.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Speaker.
    #[must_use]
    pub const fn role(&self) -> MessageRole {
        self.role
    }

    /// Text of the turn.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A session tool offered to the model.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

impl ToolDeclaration {
    /// Declares a tool under `name`, replacing characters providers reject
    /// with `_`. The parameters default to an open object schema.
    #[must_use]
    pub fn new(name: &str, description: impl Into<String>) -> Self {
        Self {
            name: function_name(name),
            description: description.into(),
            parameters: json!({ "type": "object", "properties": {} }),
        }
    }

    /// Declares `tool` of suite `suite` as `suite__tool`.
    #[must_use]
    pub fn qualified(suite: &str, tool: &str, description: impl Into<String>) -> Self {
        Self::new(&format!("{suite}__{tool}"), description)
    }

    /// Replaces the JSON schema of the tool's arguments. Non-object schemas
    /// are ignored.
    #[must_use]
    pub fn with_parameters(mut self, schema: Value) -> Self {
        if schema.is_object() {
            self.parameters = schema;
        }
        self
    }

    /// Function-safe name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description shown to the model.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Argument schema.
    #[must_use]
    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    pub(crate) fn to_function_tool(&self) -> FunctionTool {
        FunctionTool {
            kind: "function",
            function: FunctionSpec {
                name: self.name.clone(),
                description: self.description.clone(),
                parameters: self.parameters.clone(),
            },
        }
    }
}

fn function_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

/// Wire shape shared by OpenAI-compatible and Ollama chat endpoints.
#[derive(Debug, Serialize)]
pub(crate) struct FunctionTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionSpec,
}

#[derive(Debug, Serialize)]
pub(crate) struct FunctionSpec {
    name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
    parameters: Value,
}

/// Everything a model client needs for one completion.
#[derive(Clone, Debug, PartialEq)]
pub struct InferenceRequest {
    system_prompt: Option<String>,
    messages: Vec<PromptMessage>,
    max_output_tokens: Option<u32>,
    temperature: Option<f32>,
    tools: Vec<ToolDeclaration>,
}

impl InferenceRequest {
    /// Starts a request from the conversation so far.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidRequest`] when `messages` is empty.
    pub fn new(messages: Vec<PromptMessage>) -> AdapterResult<Self> {
        if messages.is_empty() {
            return Err(AdapterError::invalid_request("a request needs at least one message"));
        }
        Ok(Self {
            system_prompt: None,
            messages,
            max_output_tokens: None,
            temperature: None,
            tools: Vec::new(),
        })
    }

    /// Sets the system prompt. Chat backends send it as a leading `system`
    /// message.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Caps the completion length.
    #[must_use]
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Offers tools to the model. Later declarations with an already
    /// declared name are dropped.
    #[must_use]
    pub fn with_tools(mut self, tools: impl IntoIterator<Item = ToolDeclaration>) -> Self {
        for tool in tools {
            if !self.tools.iter().any(|known| known.name == tool.name) {
                self.tools.push(tool);
            }
        }
        self
    }

    /// System prompt, if any.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Conversation turns.
    #[must_use]
    pub fn messages(&self) -> &[PromptMessage] {
        &self.messages
    }

    /// Completion length cap.
    #[must_use]
    pub const fn max_output_tokens(&self) -> Option<u32> {
        self.max_output_tokens
    }

    /// Sampling temperature.
    #[must_use]
    pub const fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    /// Declared tools in declaration order.
    #[must_use]
    pub fn tools(&self) -> &[ToolDeclaration] {
        &self.tools
    }

    pub(crate) fn function_tools(&self) -> Vec<FunctionTool> {
        self.tools.iter().map(ToolDeclaration::to_function_tool).collect()
    }
}

/// A tool invocation the model asked for.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolCall {
    /// Declared function name (`suite__tool`).
    pub name: String,
    /// Arguments as a JSON value; `Null` when the model sent none.
    pub arguments: Value,
}

/// A slice of model output.
#[derive(Clone, Debug, PartialEq)]
pub struct InferenceChunk {
    /// Text produced since the previous chunk.
    pub delta: String,
    /// Set on the final chunk.
    pub done: bool,
    /// Tool calls requested in this chunk.
    pub tool_calls: Vec<ToolCall>,
}

impl InferenceChunk {
    /// Creates a text chunk.
    #[must_use]
    pub fn new(delta: impl Into<String>, done: bool) -> Self {
        Self {
            delta: delta.into(),
            done,
            tool_calls: Vec::new(),
        }
    }

    /// Attaches requested tool calls.
    #[must_use]
    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = calls;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello() -> Vec<PromptMessage> {
        vec![PromptMessage::new(MessageRole::User, "hello")]
    }

    #[test]
    fn empty_conversations_are_rejected() {
        let err = InferenceRequest::new(Vec::new()).expect_err("no messages");
        assert!(matches!(err, AdapterError::InvalidRequest { .. }));
    }

    #[test]
    fn qualified_names_are_function_safe() {
        let declaration = ToolDeclaration::qualified("mcp:github", "search.code", "search");
        assert_eq!(declaration.name(), "mcp_github__search_code");

        let plain = ToolDeclaration::qualified("fs", "read_file", "");
        assert_eq!(plain.name(), "fs__read_file");
    }

    #[test]
    fn non_object_schemas_keep_the_default() {
        let declaration = ToolDeclaration::new("ping", "").with_parameters(Value::Null);
        assert_eq!(declaration.parameters()["type"], "object");

        let custom = ToolDeclaration::new("ping", "")
            .with_parameters(json!({ "type": "object", "required": ["host"] }));
        assert_eq!(custom.parameters()["required"][0], "host");
    }

    #[test]
    fn repeated_tool_names_are_declared_once() {
        let request = InferenceRequest::new(hello()).unwrap().with_tools([
            ToolDeclaration::qualified("fs", "read_file", "first"),
            ToolDeclaration::qualified("fs", "read_file", "second"),
            ToolDeclaration::qualified("env", "get_env", ""),
        ]);

        let names: Vec<_> = request.tools().iter().map(ToolDeclaration::name).collect();
        assert_eq!(names, vec!["fs__read_file", "env__get_env"]);
        assert_eq!(request.tools()[0].description(), "first");
    }

    #[test]
    fn function_tools_use_the_chat_wire_shape() {
        let request = InferenceRequest::new(hello())
            .unwrap()
            .with_tools([ToolDeclaration::qualified("shell", "run_command", "Run a command")]);

        let wire = serde_json::to_value(request.function_tools()).unwrap();
        assert_eq!(wire[0]["type"], "function");
        assert_eq!(wire[0]["function"]["name"], "shell__run_command");
        assert_eq!(wire[0]["function"]["description"], "Run a command");
        assert_eq!(wire[0]["function"]["parameters"]["type"], "object");
    }
}
