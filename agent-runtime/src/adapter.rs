//! Target-specific sources of base capability modules.

use agent_primitives::{CapabilityContext, TargetTag};
use agent_tools::ModuleRef;
use async_trait::async_trait;

use crate::error::RuntimeResult;

/// Supplies the modules an execution target always carries. The composition
/// root appends registered plugins and caller modules after these.
#[async_trait]
pub trait RuntimeAdapter: Send + Sync {
    /// Target whose plugins should be instantiated alongside the base modules.
    fn target(&self) -> TargetTag;

    /// Returns the base modules for this session, in invocation order.
    async fn base_modules(&self, context: &CapabilityContext) -> RuntimeResult<Vec<ModuleRef>>;
}
