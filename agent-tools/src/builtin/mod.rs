//! Default plugin set for hosts with a local filesystem and process table.
//!
//! These are thin I/O wrappers; anything richer belongs in a dedicated plugin
//! or an MCP server.

mod env;
mod fs;
mod shell;

pub use env::{ENVIRONMENT_PLUGIN_ID, environment_plugin};
pub use fs::{FILESYSTEM_PLUGIN_ID, filesystem_plugin};
pub use shell::{SHELL_PLUGIN_ID, shell_plugin};

use crate::capability::CapabilityResult;
use crate::plugin::ToolPluginRegistry;

/// Registers the default plugins. Safe to call repeatedly: re-registration
/// replaces the previous entries in place.
///
/// # Errors
///
/// Only fails if the registry rejects an id, which the built-in ids never
/// trigger.
pub fn register_defaults(registry: &ToolPluginRegistry) -> CapabilityResult<()> {
    registry.register(filesystem_plugin())?;
    registry.register(shell_plugin())?;
    registry.register(environment_plugin())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_primitives::{CapabilityContext, TargetTag};

    #[tokio::test]
    async fn defaults_split_by_target() {
        let registry = ToolPluginRegistry::new();
        register_defaults(&registry).unwrap();
        register_defaults(&registry).unwrap();
        assert_eq!(registry.len(), 3);

        let ctx = CapabilityContext::builder("/tmp").build();
        let node = registry.instantiate(TargetTag::Node, &ctx, None).await.unwrap();
        let node_ids: Vec<_> = node.iter().map(|m| m.id().to_owned()).collect();
        assert_eq!(node_ids, vec!["filesystem", "shell", "environment"]);

        let browser = registry.instantiate(TargetTag::Browser, &ctx, None).await.unwrap();
        let browser_ids: Vec<_> = browser.iter().map(|m| m.id().to_owned()).collect();
        assert_eq!(browser_ids, vec!["environment"]);
    }
}
