//! Turns the servers declared in `.mcp.json` into tool suites.

use std::fmt;
use std::mem;
use std::sync::Arc;

use agent_primitives::CapabilityContext;
use agent_tools::{ToolError, ToolMetadata, ToolResult, ToolSuite};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::client::{McpClient, McpToolInfo};
use crate::config::{McpServerDescriptor, discover_servers};
use crate::error::McpResult;

/// Prefix of every suite id produced by the bridge.
pub const SUITE_PREFIX: &str = "mcp:";

/// Opens a client connection for a server descriptor.
#[async_trait]
pub trait McpConnector: Send + Sync {
    /// Connects to the server. The handshake is performed by the caller.
    async fn connect(
        &self,
        descriptor: &McpServerDescriptor,
        context: &CapabilityContext,
    ) -> McpResult<McpClient>;
}

/// Launches each server as a child process speaking MCP over stdio.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdioConnector;

#[async_trait]
impl McpConnector for StdioConnector {
    async fn connect(
        &self,
        descriptor: &McpServerDescriptor,
        context: &CapabilityContext,
    ) -> McpResult<McpClient> {
        McpClient::spawn(descriptor, context)
    }
}

type SharedClient = Arc<Mutex<McpClient>>;

struct Connection {
    server_id: String,
    client: SharedClient,
}

enum BridgeState {
    Uninitialized,
    Initialized(Vec<Connection>),
}

/// Lifecycle owner for a set of MCP server connections.
///
/// `initialize` connects every configured server and returns one suite per
/// server that completed the handshake and offers at least one tool.
/// `dispose` closes them again. Servers that fail at any step, or advertise
/// nothing, are logged and left out; they never fail the bridge.
pub struct McpBridge {
    connector: Arc<dyn McpConnector>,
    state: Mutex<BridgeState>,
}

impl fmt::Debug for McpBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpBridge").finish_non_exhaustive()
    }
}

impl Default for McpBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl McpBridge {
    /// Creates a bridge that spawns servers as child processes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connector(Arc::new(StdioConnector))
    }

    /// Creates a bridge using a custom connector.
    #[must_use]
    pub fn with_connector(connector: Arc<dyn McpConnector>) -> Self {
        Self {
            connector,
            state: Mutex::new(BridgeState::Uninitialized),
        }
    }

    /// Reads `.mcp.json`, connects every server, and returns their suites.
    /// Connections from a previous initialisation are closed first.
    pub async fn initialize(&self, context: &CapabilityContext) -> Vec<ToolSuite> {
        let mut state = self.state.lock().await;
        if let BridgeState::Initialized(previous) =
            mem::replace(&mut *state, BridgeState::Uninitialized)
        {
            debug!(servers = previous.len(), "re-initialising MCP bridge");
            close_all(previous).await;
        }

        let mut connections = Vec::new();
        let mut suites = Vec::new();
        for descriptor in discover_servers(context).await {
            match self.connect_server(&descriptor, context).await {
                Ok(Some((connection, suite))) => {
                    info!(server = %descriptor.id, tools = suite.len(), "MCP server connected");
                    connections.push(connection);
                    suites.push(suite);
                }
                Ok(None) => {
                    debug!(server = %descriptor.id, "MCP server offers no usable tools, skipping");
                }
                Err(err) => {
                    warn!(server = %descriptor.id, error = %err, "MCP server unavailable, skipping");
                }
            }
        }

        *state = BridgeState::Initialized(connections);
        suites
    }

    /// Closes every live connection. A no-op when not initialised.
    pub async fn dispose(&self) {
        let previous = mem::replace(&mut *self.state.lock().await, BridgeState::Uninitialized);
        if let BridgeState::Initialized(connections) = previous {
            close_all(connections).await;
        }
    }

    /// Returns `true` between `initialize` and `dispose`.
    pub async fn is_initialized(&self) -> bool {
        matches!(*self.state.lock().await, BridgeState::Initialized(_))
    }

    /// Ids of the currently connected servers.
    pub async fn server_ids(&self) -> Vec<String> {
        match &*self.state.lock().await {
            BridgeState::Initialized(connections) => {
                connections.iter().map(|c| c.server_id.clone()).collect()
            }
            BridgeState::Uninitialized => Vec::new(),
        }
    }

    async fn connect_server(
        &self,
        descriptor: &McpServerDescriptor,
        context: &CapabilityContext,
    ) -> McpResult<Option<(Connection, ToolSuite)>> {
        let mut client = self.connector.connect(descriptor, context).await?;

        let tools = match handshake(&mut client).await {
            Ok(tools) => tools,
            Err(err) => {
                client.close().await;
                return Err(err);
            }
        };

        let client = Arc::new(Mutex::new(client));
        let suite = build_suite(descriptor, &client, tools);
        if suite.is_empty() {
            client.lock().await.close().await;
            return Ok(None);
        }
        Ok(Some((
            Connection {
                server_id: descriptor.id.clone(),
                client,
            },
            suite,
        )))
    }
}

async fn handshake(client: &mut McpClient) -> McpResult<Vec<McpToolInfo>> {
    client.initialize().await?;
    client.list_tools().await
}

async fn close_all(connections: Vec<Connection>) {
    for connection in connections {
        connection.client.lock().await.close().await;
        debug!(server = %connection.server_id, "MCP server closed");
    }
}

fn build_suite(
    descriptor: &McpServerDescriptor,
    client: &SharedClient,
    tools: Vec<McpToolInfo>,
) -> ToolSuite {
    let description = descriptor
        .description
        .clone()
        .unwrap_or_else(|| format!("Tools served by MCP server `{}`", descriptor.id));
    let mut suite = ToolSuite::new(format!("{SUITE_PREFIX}{}", descriptor.id), description);

    for tool in tools {
        let metadata = match ToolMetadata::new(tool.name.clone()) {
            Ok(metadata) => metadata
                .with_description(tool.description.unwrap_or_default())
                .with_input_schema(tool.input_schema),
            Err(err) => {
                warn!(server = %descriptor.id, error = %err, "skipping MCP tool");
                continue;
            }
        };

        let client = Arc::clone(client);
        let name = tool.name;
        let executor = move |input: Value| {
            let client = Arc::clone(&client);
            let name = name.clone();
            async move { call_tool(&client, &name, input).await }
        };
        if let Err(err) = suite.register_tool(metadata, executor) {
            warn!(server = %descriptor.id, error = %err, "skipping MCP tool");
        }
    }
    suite
}

async fn call_tool(client: &SharedClient, name: &str, input: Value) -> ToolResult<Value> {
    let result = client
        .lock()
        .await
        .call_tool(name, input)
        .await
        .map_err(|err| ToolError::execution(err.to_string()))?;

    if result.is_error {
        let text = result.text();
        return Err(ToolError::execution(if text.is_empty() {
            format!("MCP tool `{name}` reported an error")
        } else {
            text
        }));
    }
    Ok(result.into_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MCP_CONFIG_FILE;
    use crate::testing::FakeConnector;
    use serde_json::json;

    fn workspace(config: &str) -> (tempfile::TempDir, CapabilityContext) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MCP_CONFIG_FILE), config).unwrap();
        let ctx = CapabilityContext::builder(dir.path()).build();
        (dir, ctx)
    }

    #[tokio::test]
    async fn one_suite_per_healthy_server() {
        let (_dir, ctx) = workspace(
            r#"{ "mcpServers": {
                "alpha": { "command": "fake", "description": "Alpha tools" },
                "refused": { "command": "refuse" },
                "silent": { "command": "mute" },
                "beta": { "command": "fake" }
            } }"#,
        );
        let bridge = McpBridge::with_connector(FakeConnector::shared());

        let suites = bridge.initialize(&ctx).await;
        let ids: Vec<_> = suites.iter().map(ToolSuite::id).collect();
        assert_eq!(ids, vec!["mcp:alpha", "mcp:beta"]);
        assert_eq!(suites[0].description(), "Alpha tools");
        assert_eq!(bridge.server_ids().await, vec!["alpha".to_owned(), "beta".to_owned()]);

        let out = suites[0].invoke("greet", json!({ "name": "Lin" })).await.unwrap();
        assert_eq!(out, json!("hello\nLin"));

        let err = suites[1].invoke("fail", json!({})).await.expect_err("isError");
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn servers_without_tools_are_closed_and_left_out() {
        let (_dir, ctx) = workspace(
            r#"{ "idle": { "command": "idle" }, "busy": { "command": "fake" } }"#,
        );
        let bridge = McpBridge::with_connector(FakeConnector::shared());

        let suites = bridge.initialize(&ctx).await;
        let ids: Vec<_> = suites.iter().map(ToolSuite::id).collect();
        assert_eq!(ids, vec!["mcp:busy"]);
        assert_eq!(bridge.server_ids().await, vec!["busy".to_owned()]);
        bridge.dispose().await;
    }

    #[tokio::test]
    async fn missing_config_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = CapabilityContext::builder(dir.path()).build();
        let bridge = McpBridge::with_connector(FakeConnector::shared());

        assert!(bridge.initialize(&ctx).await.is_empty());
        assert!(bridge.is_initialized().await);
    }

    #[tokio::test]
    async fn dispose_is_idempotent_and_reinitialise_replaces() {
        let (_dir, ctx) = workspace(r#"{ "only": { "command": "fake" } }"#);
        let bridge = McpBridge::with_connector(FakeConnector::shared());

        bridge.dispose().await;
        assert!(!bridge.is_initialized().await);

        assert_eq!(bridge.initialize(&ctx).await.len(), 1);
        assert_eq!(bridge.initialize(&ctx).await.len(), 1);
        assert_eq!(bridge.server_ids().await.len(), 1);

        bridge.dispose().await;
        bridge.dispose().await;
        assert!(bridge.server_ids().await.is_empty());
    }
}
