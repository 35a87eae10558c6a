//! Line-delimited JSON-RPC 2.0 client speaking the MCP stdio transport.

use std::fmt;
use std::process::Stdio;

use agent_primitives::CapabilityContext;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, trace};

use crate::config::McpServerDescriptor;
use crate::error::{McpError, McpResult};

/// Protocol revision sent in the `initialize` request.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

type Reader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Tool advertised by a server's `tools/list`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct McpToolInfo {
    /// Tool name, unique per server.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// JSON schema for the arguments.
    #[serde(default = "default_schema", rename = "inputSchema")]
    pub input_schema: Value,
}

fn default_schema() -> Value {
    json!({ "type": "object" })
}

/// Result of `tools/call`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct McpCallResult {
    /// Content blocks (`text`, `image`, `resource`, ...).
    #[serde(default)]
    pub content: Vec<Value>,
    /// Optional structured payload.
    #[serde(default, rename = "structuredContent")]
    pub structured_content: Option<Value>,
    /// Whether the tool reported a failure.
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl McpCallResult {
    /// Joins every `text` content block with newlines.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Collapses the result into one JSON value: structured content when
    /// present, otherwise the joined text, otherwise the raw blocks.
    #[must_use]
    pub fn into_value(self) -> Value {
        if let Some(structured) = self.structured_content {
            return structured;
        }
        let text = self.text();
        if text.is_empty() && !self.content.is_empty() {
            Value::Array(self.content)
        } else {
            Value::String(text)
        }
    }
}

#[derive(Deserialize)]
struct ListToolsPage {
    #[serde(default)]
    tools: Vec<McpToolInfo>,
    #[serde(default, rename = "nextCursor")]
    next_cursor: Option<String>,
}

/// Connection to a single MCP server.
pub struct McpClient {
    server: String,
    reader: Reader,
    writer: Writer,
    next_id: u64,
    child: Option<Child>,
}

impl fmt::Debug for McpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpClient")
            .field("server", &self.server)
            .field("next_id", &self.next_id)
            .field("process", &self.child.as_ref().and_then(Child::id))
            .finish_non_exhaustive()
    }
}

impl McpClient {
    /// Wraps an already-connected pair of streams.
    pub fn from_streams<R, W>(server: impl Into<String>, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            server: server.into(),
            reader: BufReader::new(Box::new(reader)),
            writer: Box::new(writer),
            next_id: 1,
            child: None,
        }
    }

    /// Spawns the server process described by `descriptor` in the session
    /// working directory. The child sees the session environment overlaid with
    /// the descriptor's own variables.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Spawn`] if the process cannot be started.
    pub fn spawn(descriptor: &McpServerDescriptor, context: &CapabilityContext) -> McpResult<Self> {
        let mut child = Command::new(&descriptor.command)
            .args(&descriptor.args)
            .current_dir(context.working_dir())
            .env_clear()
            .envs(context.env())
            .envs(&descriptor.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| McpError::Spawn {
                server: descriptor.id.clone(),
                source,
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(McpError::protocol(&descriptor.id, "child stdio was not captured"));
        };

        debug!(server = %descriptor.id, command = %descriptor.command, pid = ?child.id(), "MCP server spawned");
        let mut client = Self::from_streams(descriptor.id.clone(), stdout, stdin);
        client.child = Some(child);
        Ok(client)
    }

    /// Server id this client talks to.
    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Performs the `initialize` request and the `notifications/initialized`
    /// notification. Returns the server's `initialize` result.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a JSON-RPC error reply.
    pub async fn initialize(&mut self) -> McpResult<Value> {
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            )
            .await?;
        self.notify("notifications/initialized", json!({})).await?;
        Ok(result)
    }

    /// Lists every tool, following `nextCursor` pagination.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a malformed page.
    pub async fn list_tools(&mut self) -> McpResult<Vec<McpToolInfo>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor
                .as_ref()
                .map_or_else(|| json!({}), |c| json!({ "cursor": c }));
            let page: ListToolsPage = serde_json::from_value(self.request("tools/list", params).await?)
                .map_err(|err| McpError::protocol(&self.server, format!("bad tools/list page: {err}")))?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(tools)
    }

    /// Calls a tool by name.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, a JSON-RPC error reply, or a malformed
    /// result. A result flagged `isError` is returned as `Ok`.
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> McpResult<McpCallResult> {
        let arguments = if arguments.is_null() { json!({}) } else { arguments };
        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        serde_json::from_value(result)
            .map_err(|err| McpError::protocol(&self.server, format!("bad tools/call result: {err}")))
    }

    /// Terminates the server process, if any, and reaps it. A process that
    /// already exited is not an error.
    pub async fn close(&mut self) {
        let _ = self.writer.shutdown().await;
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill().await {
                debug!(server = %self.server, error = %err, "MCP server already gone");
            }
        }
    }

    async fn notify(&mut self, method: &str, params: Value) -> McpResult<()> {
        self.send(&json!({ "jsonrpc": "2.0", "method": method, "params": params }))
            .await
    }

    async fn request(&mut self, method: &str, params: Value) -> McpResult<Value> {
        let id = self.next_id;
        self.next_id += 1;
        self.send(&json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }))
            .await?;

        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Err(McpError::Closed {
                    server: self.server.clone(),
                });
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let message: Value = serde_json::from_str(trimmed).map_err(|err| {
                McpError::protocol(&self.server, format!("invalid JSON-RPC message: {err}"))
            })?;

            // Server-initiated notifications and requests are not answered.
            if message.get("method").is_some() || message.get("id").and_then(Value::as_u64) != Some(id) {
                trace!(server = %self.server, %message, "ignoring unrelated MCP message");
                continue;
            }

            if let Some(error) = message.get("error") {
                return Err(McpError::Rpc {
                    server: self.server.clone(),
                    code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
                    message: error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_owned(),
                });
            }
            return Ok(message.get("result").cloned().unwrap_or(Value::Null));
        }
    }

    async fn send(&mut self, message: &Value) -> McpResult<()> {
        let mut encoded = serde_json::to_vec(message)?;
        encoded.push(b'\n');
        self.writer.write_all(&encoded).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_client, fake_client_with, standard_server};

    #[tokio::test]
    async fn handshake_then_paginated_listing() {
        let mut client = fake_client("fake");
        let info = client.initialize().await.unwrap();
        assert_eq!(info["protocolVersion"], PROTOCOL_VERSION);

        let tools = client.list_tools().await.unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["greet", "fail", "stats"]);
        assert_eq!(tools[0].description.as_deref(), Some("Say hello"));
    }

    #[tokio::test]
    async fn call_results_carry_text_and_error_flag() {
        let mut client = fake_client("fake");
        client.initialize().await.unwrap();

        let ok = client.call_tool("greet", json!({ "name": "Ada" })).await.unwrap();
        assert!(!ok.is_error);
        assert_eq!(ok.text(), "hello\nAda");

        let failed = client.call_tool("fail", Value::Null).await.unwrap();
        assert!(failed.is_error);

        let stats = client.call_tool("stats", json!({})).await.unwrap();
        assert_eq!(stats.into_value(), json!({ "calls": 3 }));
    }

    #[tokio::test]
    async fn rpc_errors_surface() {
        let mut client = fake_client("fake");
        let err = client
            .call_tool("does-not-exist", json!({}))
            .await
            .expect_err("unknown tool");
        assert!(matches!(err, McpError::Rpc { code: -32602, .. }));
    }

    #[tokio::test]
    async fn closed_stream_is_reported() {
        let mut client = fake_client_with("mute", standard_server, true);
        let err = client.initialize().await.expect_err("closed");
        assert!(matches!(err, McpError::Closed { ref server } if server == "mute"));
    }

    #[tokio::test]
    async fn close_tolerates_missing_process() {
        let mut client = fake_client("fake");
        client.close().await;
        client.close().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_failure_names_server() {
        let descriptor = McpServerDescriptor {
            id: "ghost".into(),
            command: "/definitely/not/a/binary".into(),
            args: Vec::new(),
            env: std::collections::BTreeMap::new(),
            description: None,
        };
        let ctx = CapabilityContext::builder(std::env::temp_dir()).build();
        let err = McpClient::spawn(&descriptor, &ctx).expect_err("missing binary");
        assert!(matches!(err, McpError::Spawn { ref server, .. } if server == "ghost"));
    }
}
