//! `.mcp.json` discovery and placeholder resolution.
//!
//! The file lives at the root of the session working directory and is read
//! fresh on every bridge initialisation. Two shapes are accepted:
//!
//! ```json
//! { "fs": { "command": "mcp-fs", "args": ["${WORKSPACE_ROOT}"] } }
//! ```
//!
//! or the same mapping nested under `"mcpServers"`.

use std::collections::BTreeMap;
use std::io::ErrorKind;

use agent_primitives::CapabilityContext;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{McpError, McpResult};

/// File name looked up under the working directory.
pub const MCP_CONFIG_FILE: &str = ".mcp.json";

/// Placeholder replaced by the session working directory.
pub const WORKSPACE_ROOT_PLACEHOLDER: &str = "WORKSPACE_ROOT";

/// A launchable MCP server with every placeholder resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct McpServerDescriptor {
    /// Server id (key in `.mcp.json`).
    pub id: String,
    /// Executable to spawn.
    pub command: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Extra environment layered over the session environment.
    pub env: BTreeMap<String, String>,
    /// Optional human-readable description.
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawServerEntry {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct WrappedServers {
    #[serde(rename = "mcpServers")]
    servers: IndexMap<String, Value>,
}

/// Reads `.mcp.json` from the context's working directory.
///
/// A missing file yields no servers. An unreadable or unparsable file yields
/// no servers and a warning. Individual malformed entries are skipped.
pub async fn discover_servers(context: &CapabilityContext) -> Vec<McpServerDescriptor> {
    let path = context.working_dir().join(MCP_CONFIG_FILE);
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no MCP configuration found");
            return Vec::new();
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read MCP configuration");
            return Vec::new();
        }
    };

    match parse_servers(&text, context) {
        Ok(servers) => servers,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring MCP configuration");
            Vec::new()
        }
    }
}

/// Parses a configuration document, resolving placeholders against `context`.
/// Entries that fail validation are logged and skipped; the order of the
/// document is preserved.
///
/// # Errors
///
/// Fails only when the document as a whole is not a JSON object of either
/// accepted shape.
pub fn parse_servers(
    text: &str,
    context: &CapabilityContext,
) -> McpResult<Vec<McpServerDescriptor>> {
    let top: IndexMap<String, Value> = serde_json::from_str(text)?;
    let entries = match top.get("mcpServers") {
        Some(Value::Object(_)) => serde_json::from_str::<WrappedServers>(text)?.servers,
        Some(_) => return Err(McpError::config("mcpServers", "expected an object")),
        None => top,
    };

    let mut servers = Vec::with_capacity(entries.len());
    for (id, entry) in entries {
        match descriptor_from_entry(&id, entry, context) {
            Ok(descriptor) => servers.push(descriptor),
            Err(err) => warn!(server = %id, error = %err, "skipping MCP server"),
        }
    }
    Ok(servers)
}

fn descriptor_from_entry(
    id: &str,
    entry: Value,
    context: &CapabilityContext,
) -> McpResult<McpServerDescriptor> {
    let raw: RawServerEntry =
        serde_json::from_value(entry).map_err(|err| McpError::config(id, err.to_string()))?;

    let resolve = |value: &str| resolve_placeholders(value, context).map_err(|r| McpError::config(id, r));

    let command = resolve(raw.command.trim())?;
    if command.trim().is_empty() {
        return Err(McpError::config(id, "command cannot be empty"));
    }

    let args = raw
        .args
        .iter()
        .map(|arg| resolve(arg))
        .collect::<McpResult<Vec<_>>>()?;

    let mut env = BTreeMap::new();
    for (key, value) in &raw.env {
        env.insert(key.clone(), resolve(value)?);
    }

    Ok(McpServerDescriptor {
        id: id.to_owned(),
        command,
        args,
        env,
        description: raw.description,
    })
}

/// Expands `${WORKSPACE_ROOT}` and `${NAME}` occurrences in `value`.
///
/// `${NAME}` is looked up in the session environment mapping, never the host
/// process environment.
///
/// # Errors
///
/// Returns a description of the first unterminated or unresolvable
/// placeholder.
pub fn resolve_placeholders(value: &str, context: &CapabilityContext) -> Result<String, String> {
    let mut output = String::with_capacity(value.len());
    let mut remaining = value;
    while let Some(start) = remaining.find("${") {
        output.push_str(&remaining[..start]);
        let after = &remaining[start + 2..];
        let Some(end) = after.find('}') else {
            return Err(format!("unterminated placeholder in `{value}`"));
        };
        let name = &after[..end];
        if name.is_empty() {
            return Err(format!("empty placeholder in `{value}`"));
        }

        if name == WORKSPACE_ROOT_PLACEHOLDER {
            output.push_str(&context.working_dir().to_string_lossy());
        } else {
            let resolved = context
                .env_var(name)
                .ok_or_else(|| format!("`${{{name}}}` is not set in the session environment"))?;
            output.push_str(resolved);
        }
        remaining = &after[end + 1..];
    }
    output.push_str(remaining);
    Ok(output)
}
