//! Capability module exposing MCP servers as one session contribution.

use std::fmt;
use std::sync::Arc;

use agent_primitives::CapabilityContext;
use agent_tools::{
    CapabilityContribution, CapabilityModule, CapabilityResult, Disposer, ModuleRef,
};
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::bridge::{McpBridge, McpConnector, StdioConnector};

/// Module id used by [`McpCapabilityModule`].
pub const MCP_MODULE_ID: &str = "mcp";

/// Capability module that exposes every configured MCP server for the
/// lifetime of one session.
pub struct McpCapabilityModule {
    connector: Arc<dyn McpConnector>,
}

impl fmt::Debug for McpCapabilityModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpCapabilityModule").finish_non_exhaustive()
    }
}

impl Default for McpCapabilityModule {
    fn default() -> Self {
        Self::new()
    }
}

impl McpCapabilityModule {
    /// Module spawning servers as child processes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connector(Arc::new(StdioConnector))
    }

    /// Module using a custom connector.
    #[must_use]
    pub fn with_connector(connector: Arc<dyn McpConnector>) -> Self {
        Self { connector }
    }

    /// Wraps the module in a shared handle.
    #[must_use]
    pub fn shared(self) -> ModuleRef {
        Arc::new(self)
    }
}

#[async_trait]
impl CapabilityModule for McpCapabilityModule {
    fn id(&self) -> &str {
        MCP_MODULE_ID
    }

    async fn create(
        &self,
        context: &CapabilityContext,
    ) -> CapabilityResult<Option<CapabilityContribution>> {
        let bridge = Arc::new(McpBridge::with_connector(Arc::clone(&self.connector)));
        let suites = bridge.initialize(context).await;
        if suites.is_empty() {
            bridge.dispose().await;
            debug!("no MCP servers available");
            return Ok(None);
        }

        let servers = bridge.server_ids().await;
        let contribution = CapabilityContribution::from_suites(
            MCP_MODULE_ID,
            "Tools discovered from Model Context Protocol servers",
            suites,
        )?
        .with_metadata("servers", json!(servers))
        .with_disposer(Disposer::new(move || async move {
            bridge.dispose().await;
            Ok(())
        }));
        Ok(Some(contribution))
    }
}
