//! `shell` suite: runs commands in the session's working directory.

use std::process::Stdio;
use std::sync::Arc;

use agent_primitives::{CapabilityContext, TargetTag};
use serde_json::{Value, json};
use tokio::process::Command;
use tracing::debug;

use crate::capability::{CapabilityContribution, CapabilityResult, FnModule, ModuleRef};
use crate::plugin::ToolPlugin;
use crate::suite::ToolSuite;
use crate::tool::{ToolError, ToolMetadata, ToolResult, required_str};

/// Registry id of the shell plugin.
pub const SHELL_PLUGIN_ID: &str = "shell";

/// Node-only plugin exposing the `shell` suite.
#[must_use]
pub fn shell_plugin() -> ToolPlugin {
    ToolPlugin::new(SHELL_PLUGIN_ID, |_ctx| async { Ok(module()) })
        .with_description("Run command lines through the platform shell")
        .with_targets([TargetTag::Node])
}

fn module() -> ModuleRef {
    FnModule::new(SHELL_PLUGIN_ID, |ctx| async move { contribution(&ctx) }).shared()
}

fn contribution(ctx: &CapabilityContext) -> CapabilityResult<Option<CapabilityContribution>> {
    Ok(Some(CapabilityContribution::new(
        SHELL_PLUGIN_ID,
        "Local process execution",
        suite(ctx)?,
    )))
}

fn suite(ctx: &CapabilityContext) -> ToolResult<ToolSuite> {
    let session = Arc::new(ctx.clone());
    ToolSuite::new("shell", "Command execution in the session working directory").with_tool(
        ToolMetadata::new("run_command")?
            .with_description("Run a command line and capture its exit status and output")
            .with_input_schema(json!({
                "type": "object",
                "properties": { "command": { "type": "string" } },
                "required": ["command"]
            })),
        move |input: Value| {
            let ctx = Arc::clone(&session);
            async move { run_command(&ctx, &input).await }
        },
    )
}

fn platform_shell(command_line: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command_line);
        cmd
    } else {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(command_line);
        cmd
    }
}

async fn run_command(ctx: &CapabilityContext, input: &Value) -> ToolResult<Value> {
    let command_line = required_str(input, "command")?;
    debug!(command = %command_line, cwd = %ctx.working_dir().display(), "running shell command");

    let output = platform_shell(command_line)
        .current_dir(ctx.working_dir())
        .env_clear()
        .envs(ctx.env())
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|err| ToolError::execution(format!("failed to spawn `{command_line}`: {err}")))?;

    Ok(json!({
        "status": output.status.code(),
        "success": output.status.success(),
        "stdout": String::from_utf8_lossy(&output.stdout),
        "stderr": String::from_utf8_lossy(&output.stderr),
    }))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_in_working_dir_with_session_env() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), "").unwrap();
        let ctx = CapabilityContext::builder(dir.path())
            .env_var("GREETING", "hello")
            .build();
        let suite = suite(&ctx).unwrap();

        let out = suite
            .invoke("run_command", json!({ "command": "echo $GREETING; test -f marker" }))
            .await
            .unwrap();
        assert_eq!(out["stdout"], "hello\n");
        assert_eq!(out["success"], true);
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let suite = suite(&CapabilityContext::builder(dir.path()).build()).unwrap();

        let out = suite
            .invoke("run_command", json!({ "command": "exit 3" }))
            .await
            .unwrap();
        assert_eq!(out["status"], 3);
        assert_eq!(out["success"], false);
    }

    #[tokio::test]
    async fn missing_command_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let suite = suite(&CapabilityContext::builder(dir.path()).build()).unwrap();
        let err = suite.invoke("run_command", json!({})).await.expect_err("no command");
        assert!(matches!(err, ToolError::InvalidInput { .. }));
    }
}
