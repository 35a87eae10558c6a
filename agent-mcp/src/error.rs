use thiserror::Error;

/// Result alias for MCP operations.
pub type McpResult<T> = Result<T, McpError>;

/// Errors raised by MCP discovery, transport, and protocol handling.
#[derive(Debug, Error)]
pub enum McpError {
    /// A server descriptor is unusable.
    #[error("invalid MCP server `{server}`: {reason}")]
    Config {
        /// Server id from `.mcp.json`.
        server: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The configuration document is not valid JSON of the expected shape.
    #[error("failed to decode MCP configuration: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server process could not be started.
    #[error("failed to spawn MCP server `{server}`: {source}")]
    Spawn {
        /// Server id.
        server: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to the server failed.
    #[error("MCP transport error: {0}")]
    Io(#[from] std::io::Error),

    /// The server closed its output stream.
    #[error("MCP server `{server}` closed the connection")]
    Closed {
        /// Server id.
        server: String,
    },

    /// The server answered with a JSON-RPC error.
    #[error("MCP server `{server}` returned error {code}: {message}")]
    Rpc {
        /// Server id.
        server: String,
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
    },

    /// The server sent something that is not valid MCP.
    #[error("MCP protocol violation from `{server}`: {reason}")]
    Protocol {
        /// Server id.
        server: String,
        /// Human-readable reason.
        reason: String,
    },
}

impl McpError {
    /// Convenience constructor for descriptor problems.
    #[must_use]
    pub fn config(server: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            server: server.into(),
            reason: reason.into(),
        }
    }

    /// Convenience constructor for protocol violations.
    #[must_use]
    pub fn protocol(server: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Protocol {
            server: server.into(),
            reason: reason.into(),
        }
    }
}
