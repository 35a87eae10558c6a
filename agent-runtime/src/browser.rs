//! Adapter for sandboxed hosts.

use agent_primitives::{CapabilityContext, TargetTag};
use agent_tools::ModuleRef;
use async_trait::async_trait;

use crate::adapter::RuntimeAdapter;
use crate::error::RuntimeResult;

/// Adapter for sandboxed hosts without filesystem or process access. It only
/// returns the modules its caller injected.
#[derive(Default)]
pub struct BrowserAdapter {
    modules: Vec<ModuleRef>,
}

impl std::fmt::Debug for BrowserAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<_> = self.modules.iter().map(|m| m.id()).collect();
        f.debug_struct("BrowserAdapter").field("modules", &ids).finish()
    }
}

impl BrowserAdapter {
    /// Creates an adapter returning `modules`.
    #[must_use]
    pub fn new(modules: Vec<ModuleRef>) -> Self {
        Self { modules }
    }

    /// Adds one more injected module.
    #[must_use]
    pub fn with_module(mut self, module: ModuleRef) -> Self {
        self.modules.push(module);
        self
    }
}

#[async_trait]
impl RuntimeAdapter for BrowserAdapter {
    fn target(&self) -> TargetTag {
        TargetTag::Browser
    }

    async fn base_modules(&self, _context: &CapabilityContext) -> RuntimeResult<Vec<ModuleRef>> {
        Ok(self.modules.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_tools::{StaticModule, ToolSuite};
    use std::sync::Arc;

    #[tokio::test]
    async fn returns_only_injected_modules() {
        let ctx = CapabilityContext::builder("/").build();
        assert!(BrowserAdapter::default().base_modules(&ctx).await.unwrap().is_empty());

        let injected: ModuleRef = Arc::new(StaticModule::new(
            "storage",
            "IndexedDB access",
            vec![ToolSuite::new("storage", "")],
        ));
        let adapter = BrowserAdapter::new(vec![injected]);
        let modules = adapter.base_modules(&ctx).await.unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].id(), "storage");
        assert_eq!(adapter.target(), TargetTag::Browser);
    }
}
