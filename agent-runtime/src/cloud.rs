//! Remote execution surface: suites live on another host and every tool call
//! is proxied over a [`RemoteTransport`].

use std::fmt;
use std::sync::Arc;

use agent_primitives::{CapabilityContext, TargetTag};
use agent_tools::{
    CapabilityContribution, CapabilityError, CapabilityModule, CapabilityResult, Disposer,
    ModuleRef, ToolError, ToolMetadata, ToolSuite,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::adapter::RuntimeAdapter;
use crate::error::RuntimeResult;

/// Module id of [`RemoteCapabilityModule`].
pub const REMOTE_MODULE_ID: &str = "remote";

/// One tool as advertised by the remote surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteToolDescriptor {
    /// Tool name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Parameter schema.
    #[serde(default = "object_schema", rename = "inputSchema", alias = "input_schema")]
    pub input_schema: Value,
}

fn object_schema() -> Value {
    json!({ "type": "object" })
}

/// One suite as advertised by the remote surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteSuiteDescriptor {
    /// Suite id.
    pub id: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Tools in the suite.
    #[serde(default)]
    pub tools: Vec<RemoteToolDescriptor>,
}

/// Connection to a remote execution surface.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Lists the suites the remote side offers.
    async fn list_suites(&self) -> RuntimeResult<Vec<RemoteSuiteDescriptor>>;

    /// Invokes `tool` in `suite` remotely.
    async fn invoke(&self, suite: &str, tool: &str, input: Value) -> RuntimeResult<Value>;

    /// Releases transport resources at session end.
    async fn close(&self) -> RuntimeResult<()> {
        Ok(())
    }
}

/// Module proxying every remote suite as local tools.
pub struct RemoteCapabilityModule {
    transport: Arc<dyn RemoteTransport>,
}

impl fmt::Debug for RemoteCapabilityModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCapabilityModule").finish_non_exhaustive()
    }
}

impl RemoteCapabilityModule {
    /// Wraps a transport.
    #[must_use]
    pub fn new(transport: Arc<dyn RemoteTransport>) -> Self {
        Self { transport }
    }

    fn proxy_suite(&self, remote: RemoteSuiteDescriptor) -> ToolSuite {
        let mut suite = ToolSuite::new(remote.id.clone(), remote.description);
        for tool in remote.tools {
            let metadata = match ToolMetadata::new(tool.name.clone()) {
                Ok(metadata) => metadata
                    .with_description(tool.description)
                    .with_input_schema(tool.input_schema),
                Err(err) => {
                    warn!(suite = %remote.id, error = %err, "skipping remote tool");
                    continue;
                }
            };

            let transport = Arc::clone(&self.transport);
            let suite_id = remote.id.clone();
            let tool_name = tool.name;
            let executor = move |input: Value| {
                let transport = Arc::clone(&transport);
                let suite_id = suite_id.clone();
                let tool_name = tool_name.clone();
                async move {
                    transport
                        .invoke(&suite_id, &tool_name, input)
                        .await
                        .map_err(|err| ToolError::execution(err.to_string()))
                }
            };
            if let Err(err) = suite.register_tool(metadata, executor) {
                warn!(suite = %remote.id, error = %err, "skipping remote tool");
            }
        }
        suite
    }
}

#[async_trait]
impl CapabilityModule for RemoteCapabilityModule {
    fn id(&self) -> &str {
        REMOTE_MODULE_ID
    }

    async fn create(
        &self,
        _context: &CapabilityContext,
    ) -> CapabilityResult<Option<CapabilityContribution>> {
        let remote = self
            .transport
            .list_suites()
            .await
            .map_err(|err| CapabilityError::creation(REMOTE_MODULE_ID, err.to_string()))?;
        if remote.is_empty() {
            debug!("remote surface offers no suites");
            return Ok(None);
        }

        let suites: Vec<ToolSuite> = remote.into_iter().map(|s| self.proxy_suite(s)).collect();
        let transport = Arc::clone(&self.transport);
        let contribution = CapabilityContribution::from_suites(
            REMOTE_MODULE_ID,
            "Tools executed on the remote surface",
            suites,
        )?
        .with_disposer(Disposer::new(move || async move {
            transport
                .close()
                .await
                .map_err(|err| CapabilityError::disposal(err.to_string()))
        }));
        Ok(Some(contribution))
    }
}

/// Adapter for sessions whose tools run on a remote execution surface.
pub struct CloudAdapter {
    transport: Arc<dyn RemoteTransport>,
}

impl fmt::Debug for CloudAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudAdapter").finish_non_exhaustive()
    }
}

impl CloudAdapter {
    /// Creates an adapter over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn RemoteTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl RuntimeAdapter for CloudAdapter {
    fn target(&self) -> TargetTag {
        TargetTag::Cloud
    }

    async fn base_modules(&self, _context: &CapabilityContext) -> RuntimeResult<Vec<ModuleRef>> {
        let module: ModuleRef = Arc::new(RemoteCapabilityModule::new(Arc::clone(&self.transport)));
        Ok(vec![module])
    }
}
