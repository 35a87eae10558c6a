//! Adapter for hosts with a filesystem and process spawning.

use std::fmt;
use std::sync::Arc;

use agent_mcp::{McpCapabilityModule, McpConnector, StdioConnector};
use agent_primitives::{CapabilityContext, TargetTag};
use agent_tools::{ModuleRef, ToolPluginRegistry, builtin};
use async_trait::async_trait;
use tracing::debug;

use crate::adapter::RuntimeAdapter;
use crate::error::RuntimeResult;

/// Adapter for hosts with a local filesystem and process table.
///
/// On every call it (re)registers the default on-disk plugins into the shared
/// plugin registry and returns the MCP capability module unless disabled.
pub struct NodeAdapter {
    plugins: Arc<ToolPluginRegistry>,
    mcp: Option<Arc<dyn McpConnector>>,
}

impl fmt::Debug for NodeAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeAdapter")
            .field("mcp_enabled", &self.mcp.is_some())
            .finish_non_exhaustive()
    }
}

impl NodeAdapter {
    /// Creates an adapter that registers defaults into `plugins` and bridges
    /// MCP servers over stdio.
    #[must_use]
    pub fn new(plugins: Arc<ToolPluginRegistry>) -> Self {
        Self {
            plugins,
            mcp: Some(Arc::new(StdioConnector)),
        }
    }

    /// Disables the MCP module.
    #[must_use]
    pub fn without_mcp(mut self) -> Self {
        self.mcp = None;
        self
    }

    /// Uses a custom MCP connector.
    #[must_use]
    pub fn with_mcp_connector(mut self, connector: Arc<dyn McpConnector>) -> Self {
        self.mcp = Some(connector);
        self
    }
}

#[async_trait]
impl RuntimeAdapter for NodeAdapter {
    fn target(&self) -> TargetTag {
        TargetTag::Node
    }

    async fn base_modules(&self, _context: &CapabilityContext) -> RuntimeResult<Vec<ModuleRef>> {
        builtin::register_defaults(&self.plugins)?;
        debug!(plugins = self.plugins.len(), "default node plugins registered");

        Ok(self
            .mcp
            .iter()
            .map(|connector| McpCapabilityModule::with_connector(Arc::clone(connector)).shared())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registers_defaults_and_offers_mcp() {
        let plugins = Arc::new(ToolPluginRegistry::new());
        let adapter = NodeAdapter::new(Arc::clone(&plugins));
        let ctx = CapabilityContext::builder("/tmp").build();

        let modules = adapter.base_modules(&ctx).await.unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].id(), "mcp");
        assert!(plugins.get(builtin::FILESYSTEM_PLUGIN_ID).is_some());

        let without = NodeAdapter::new(plugins).without_mcp();
        assert!(without.base_modules(&ctx).await.unwrap().is_empty());
    }
}
