//! In-memory MCP server used by the unit tests.

use std::sync::Arc;

use agent_primitives::CapabilityContext;
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

use crate::bridge::McpConnector;
use crate::client::{McpClient, PROTOCOL_VERSION};
use crate::config::McpServerDescriptor;
use crate::error::{McpError, McpResult};

pub(crate) type Handler = fn(&Value) -> Vec<Value>;

pub(crate) fn fake_client(server: &str) -> McpClient {
    fake_client_with(server, standard_server, false)
}

pub(crate) fn fake_client_with(server: &str, handler: Handler, hang_up: bool) -> McpClient {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (read, write) = tokio::io::split(client_io);
    tokio::spawn(serve(server_io, handler, hang_up));
    McpClient::from_streams(server, read, write)
}

async fn serve(io: DuplexStream, handler: Handler, hang_up: bool) {
    let (read, mut write) = tokio::io::split(io);
    let mut lines = BufReader::new(read).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if hang_up {
            return;
        }
        let Ok(message) = serde_json::from_str::<Value>(&line) else {
            continue;
        };
        for reply in handler(&message) {
            let mut encoded = reply.to_string().into_bytes();
            encoded.push(b'\n');
            if write.write_all(&encoded).await.is_err() {
                return;
            }
        }
    }
}

fn reply(message: &Value, result: Value) -> Vec<Value> {
    vec![json!({ "jsonrpc": "2.0", "id": message["id"], "result": result })]
}

fn error(message: &Value, code: i64, text: &str) -> Vec<Value> {
    vec![json!({
        "jsonrpc": "2.0",
        "id": message["id"],
        "error": { "code": code, "message": text }
    })]
}

pub(crate) fn standard_server(message: &Value) -> Vec<Value> {
    let params = &message["params"];
    match message["method"].as_str().unwrap_or_default() {
        "initialize" => reply(
            message,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": { "name": "fake", "version": "0.0.0" }
            }),
        ),
        "notifications/initialized" => Vec::new(),
        "tools/list" if params.get("cursor").is_none() => reply(
            message,
            json!({
                "tools": [
                    { "name": "greet", "description": "Say hello",
                      "inputSchema": { "type": "object", "properties": { "name": { "type": "string" } } } },
                    { "name": "fail" }
                ],
                "nextCursor": "2"
            }),
        ),
        "tools/list" => reply(message, json!({ "tools": [ { "name": "stats" } ] })),
        "tools/call" => match params["name"].as_str().unwrap_or_default() {
            "greet" => {
                let mut out = vec![json!({
                    "jsonrpc": "2.0",
                    "method": "notifications/progress",
                    "params": { "progress": 1 }
                })];
                out.extend(reply(
                    message,
                    json!({ "content": [
                        { "type": "text", "text": "hello" },
                        { "type": "text", "text": params["arguments"]["name"] }
                    ] }),
                ));
                out
            }
            "fail" => reply(
                message,
                json!({ "content": [ { "type": "text", "text": "boom" } ], "isError": true }),
            ),
            "stats" => reply(
                message,
                json!({
                    "content": [ { "type": "text", "text": "{\"calls\":3}" } ],
                    "structuredContent": { "calls": 3 }
                }),
            ),
            _ => error(message, -32602, "unknown tool"),
        },
        _ => error(message, -32601, "method not found"),
    }
}

/// Completes the handshake but advertises no tools.
pub(crate) fn idle_server(message: &Value) -> Vec<Value> {
    if message["method"] == "tools/list" {
        return reply(message, json!({ "tools": [] }));
    }
    standard_server(message)
}

/// Connector backed by in-memory servers. Descriptors whose command is
/// `refuse` fail to connect, `mute` hang up during the handshake, and `idle`
/// list no tools.
#[derive(Debug, Default)]
pub(crate) struct FakeConnector;

impl FakeConnector {
    pub(crate) fn shared() -> Arc<dyn McpConnector> {
        Arc::new(Self)
    }
}

#[async_trait]
impl McpConnector for FakeConnector {
    async fn connect(
        &self,
        descriptor: &McpServerDescriptor,
        _context: &CapabilityContext,
    ) -> McpResult<McpClient> {
        match descriptor.command.as_str() {
            "refuse" => Err(McpError::Spawn {
                server: descriptor.id.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "refused"),
            }),
            "mute" => Ok(fake_client_with(&descriptor.id, standard_server, true)),
            "idle" => Ok(fake_client_with(&descriptor.id, idle_server, false)),
            _ => Ok(fake_client(&descriptor.id)),
        }
    }
}
