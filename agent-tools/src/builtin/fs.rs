//! `fs` suite: file access; relative paths resolve against the session's
//! working directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agent_primitives::{CapabilityContext, TargetTag};
use serde_json::{Value, json};

use crate::capability::{CapabilityContribution, CapabilityResult, FnModule, ModuleRef};
use crate::plugin::ToolPlugin;
use crate::suite::ToolSuite;
use crate::tool::{ToolError, ToolMetadata, ToolResult, required_str};

/// Registry id of the filesystem plugin.
pub const FILESYSTEM_PLUGIN_ID: &str = "filesystem";

/// Node-only plugin exposing the `fs` suite.
#[must_use]
pub fn filesystem_plugin() -> ToolPlugin {
    ToolPlugin::new(FILESYSTEM_PLUGIN_ID, |_ctx| async { Ok(module()) })
        .with_description("Read, write, and list files relative to the working directory")
        .with_targets([TargetTag::Node])
}

fn module() -> ModuleRef {
    FnModule::new(FILESYSTEM_PLUGIN_ID, |ctx| async move { contribution(&ctx) }).shared()
}

fn contribution(ctx: &CapabilityContext) -> CapabilityResult<Option<CapabilityContribution>> {
    let suite = suite(ctx)?;
    Ok(Some(CapabilityContribution::new(
        FILESYSTEM_PLUGIN_ID,
        "Local filesystem access",
        suite,
    )))
}

fn suite(ctx: &CapabilityContext) -> ToolResult<ToolSuite> {
    let root = Arc::new(ctx.clone());

    let read_root = Arc::clone(&root);
    let write_root = Arc::clone(&root);
    let list_root = root;

    ToolSuite::new("fs", "Filesystem operations scoped to the session working directory")
        .with_tool(
            ToolMetadata::new("read_file")?
                .with_description("Read a UTF-8 text file")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": { "path": { "type": "string" } },
                    "required": ["path"]
                })),
            move |input: Value| {
                let ctx = Arc::clone(&read_root);
                async move { read_file(&ctx, &input).await }
            },
        )?
        .with_tool(
            ToolMetadata::new("write_file")?
                .with_description("Write a UTF-8 text file, creating parent directories")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string" },
                        "contents": { "type": "string" }
                    },
                    "required": ["path", "contents"]
                })),
            move |input: Value| {
                let ctx = Arc::clone(&write_root);
                async move { write_file(&ctx, &input).await }
            },
        )?
        .with_tool(
            ToolMetadata::new("list_directory")?
                .with_description("List directory entries sorted by name")
                .with_input_schema(json!({
                    "type": "object",
                    "properties": { "path": { "type": "string" } }
                })),
            move |input: Value| {
                let ctx = Arc::clone(&list_root);
                async move { list_directory(&ctx, &input).await }
            },
        )
}

fn io_error(action: &str, path: &Path, err: &std::io::Error) -> ToolError {
    ToolError::execution(format!("failed to {action} `{}`: {err}", path.display()))
}

async fn read_file(ctx: &CapabilityContext, input: &Value) -> ToolResult<Value> {
    let path = ctx.resolve_path(required_str(input, "path")?);
    let contents = tokio::fs::read_to_string(&path)
        .await
        .map_err(|err| io_error("read", &path, &err))?;
    Ok(json!({ "path": path.display().to_string(), "contents": contents }))
}

async fn write_file(ctx: &CapabilityContext, input: &Value) -> ToolResult<Value> {
    let path = ctx.resolve_path(required_str(input, "path")?);
    let contents = required_str(input, "contents")?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| io_error("create", parent, &err))?;
    }
    tokio::fs::write(&path, contents)
        .await
        .map_err(|err| io_error("write", &path, &err))?;

    Ok(json!({ "path": path.display().to_string(), "bytes": contents.len() }))
}

async fn list_directory(ctx: &CapabilityContext, input: &Value) -> ToolResult<Value> {
    let relative = input.get("path").and_then(Value::as_str).unwrap_or(".");
    let path: PathBuf = ctx.resolve_path(relative);

    let mut reader = tokio::fs::read_dir(&path)
        .await
        .map_err(|err| io_error("list", &path, &err))?;

    let mut entries = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|err| io_error("list", &path, &err))?
    {
        let kind = match entry.file_type().await {
            Ok(ft) if ft.is_dir() => "directory",
            Ok(ft) if ft.is_file() => "file",
            _ => "other",
        };
        entries.push((entry.file_name().to_string_lossy().into_owned(), kind));
    }
    entries.sort();

    let entries: Vec<Value> = entries
        .into_iter()
        .map(|(name, kind)| json!({ "name": name, "kind": kind }))
        .collect();
    Ok(json!({ "path": path.display().to_string(), "entries": entries }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(dir: &Path) -> CapabilityContext {
        CapabilityContext::builder(dir).build()
    }

    #[tokio::test]
    async fn write_then_read_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let suite = suite(&session(dir.path())).unwrap();

        suite
            .invoke("write_file", json!({ "path": "notes/todo.txt", "contents": "ship it" }))
            .await
            .unwrap();
        assert!(dir.path().join("notes/todo.txt").exists());

        let out = suite
            .invoke("read_file", json!({ "path": "notes/todo.txt" }))
            .await
            .unwrap();
        assert_eq!(out["contents"], "ship it");
    }

    #[tokio::test]
    async fn list_directory_sorts_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        let suite = suite(&session(dir.path())).unwrap();

        let out = suite.invoke("list_directory", json!({})).await.unwrap();
        let entries = out["entries"].as_array().unwrap();
        assert_eq!(entries[0], json!({ "name": "a", "kind": "directory" }));
        assert_eq!(entries[1], json!({ "name": "b.txt", "kind": "file" }));
    }

    #[tokio::test]
    async fn missing_file_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let suite = suite(&session(dir.path())).unwrap();
        let err = suite
            .invoke("read_file", json!({ "path": "nope.txt" }))
            .await
            .expect_err("missing file");
        assert!(matches!(err, ToolError::Execution { .. }));
    }
}
