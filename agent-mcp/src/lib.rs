//! Model Context Protocol bridge.
//!
//! Reads `.mcp.json` from the session working directory, launches each
//! declared server over stdio, performs the MCP handshake, and exposes the
//! advertised tools as one [`ToolSuite`](agent_tools::ToolSuite) per server.
//! [`McpCapabilityModule`] packages the bridge as a capability module whose
//! disposer shuts the servers down.

#![warn(missing_docs, clippy::pedantic)]

pub mod bridge;
pub mod client;
pub mod config;
mod error;
mod module;

#[cfg(test)]
mod testing;

pub use bridge::{McpBridge, McpConnector, StdioConnector};
pub use client::{McpCallResult, McpClient, McpToolInfo};
pub use config::{McpServerDescriptor, discover_servers, parse_servers, resolve_placeholders};
pub use error::{McpError, McpResult};
pub use module::{MCP_MODULE_ID, McpCapabilityModule};
