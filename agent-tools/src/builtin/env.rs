//! `env` suite: reads the session environment.

use std::sync::Arc;

use agent_primitives::CapabilityContext;
use serde_json::{Value, json};

use crate::capability::{CapabilityContribution, CapabilityResult, FnModule, ModuleRef};
use crate::plugin::ToolPlugin;
use crate::suite::ToolSuite;
use crate::tool::{ToolMetadata, ToolResult, required_str};

/// Registry id of the environment plugin.
pub const ENVIRONMENT_PLUGIN_ID: &str = "environment";

/// Universal plugin exposing the `env` suite.
#[must_use]
pub fn environment_plugin() -> ToolPlugin {
    ToolPlugin::new(ENVIRONMENT_PLUGIN_ID, |_ctx| async { Ok(module()) })
        .with_description("Read variables from the session environment")
}

fn module() -> ModuleRef {
    FnModule::new(ENVIRONMENT_PLUGIN_ID, |ctx| async move { contribution(&ctx) }).shared()
}

fn contribution(ctx: &CapabilityContext) -> CapabilityResult<Option<CapabilityContribution>> {
    Ok(Some(CapabilityContribution::new(
        ENVIRONMENT_PLUGIN_ID,
        "Session environment lookup",
        suite(ctx)?,
    )))
}

// Only the session mapping is visible, never the host process environment.
fn suite(ctx: &CapabilityContext) -> ToolResult<ToolSuite> {
    let session = Arc::new(ctx.clone());
    ToolSuite::new("env", "Session environment variables").with_tool(
        ToolMetadata::new("get_env")?
            .with_description("Look up one environment variable; null when unset")
            .with_input_schema(json!({
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"]
            })),
        move |input: Value| {
            let ctx = Arc::clone(&session);
            async move { get_env(&ctx, &input) }
        },
    )
}

fn get_env(ctx: &CapabilityContext, input: &Value) -> ToolResult<Value> {
    let name = required_str(input, "name")?;
    Ok(json!({ "name": name, "value": ctx.env_var(name) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_session_mapping_only() {
        let ctx = CapabilityContext::builder("/tmp")
            .env_var("REGION", "eu-west-1")
            .build();
        let suite = suite(&ctx).unwrap();

        let set = suite.invoke("get_env", json!({ "name": "REGION" })).await.unwrap();
        assert_eq!(set["value"], "eu-west-1");

        let unset = suite.invoke("get_env", json!({ "name": "PATH" })).await.unwrap();
        assert!(unset["value"].is_null());
    }
}
