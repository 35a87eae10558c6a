//! Named collections of tools.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::tool::{Tool, ToolError, ToolHandle, ToolMetadata, ToolResult};

/// A named, described collection of individually callable tools. Tool names
/// are unique within a suite.
#[derive(Clone, Debug)]
pub struct ToolSuite {
    id: String,
    description: String,
    tools: IndexMap<String, ToolHandle>,
}

impl ToolSuite {
    /// Creates an empty suite.
    #[must_use]
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            tools: IndexMap::new(),
        }
    }

    /// Returns the suite identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the suite description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Adds a tool implementation.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the name is already present.
    pub fn register_tool<T>(&mut self, metadata: ToolMetadata, tool: T) -> ToolResult<()>
    where
        T: Tool + 'static,
    {
        self.register_shared(metadata, Arc::new(tool))
    }

    /// Adds a tool whose executor is already shared.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the name is already present.
    pub fn register_shared(&mut self, metadata: ToolMetadata, tool: Arc<dyn Tool>) -> ToolResult<()> {
        let name = metadata.name().to_owned();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool {
                suite: self.id.clone(),
                name,
            });
        }

        self.tools.insert(name, ToolHandle::new(metadata, tool));
        Ok(())
    }

    /// Builder-style variant of [`register_tool`](Self::register_tool).
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the name is already present.
    pub fn with_tool<T>(mut self, metadata: ToolMetadata, tool: T) -> ToolResult<Self>
    where
        T: Tool + 'static,
    {
        self.register_tool(metadata, tool)?;
        Ok(self)
    }

    /// Returns a handle to the tool matching the supplied name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolHandle> {
        self.tools.get(name)
    }

    /// Invokes a tool in this suite.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] when the tool is not found or
    /// propagates the tool's own failure.
    pub async fn invoke(&self, name: &str, input: Value) -> ToolResult<Value> {
        let handle = self.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_owned(),
        })?;
        handle.invoke(input).await
    }

    /// Lists the metadata of all tools in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<&ToolMetadata> {
        self.tools.values().map(ToolHandle::metadata).collect()
    }

    /// Iterates tool names in insertion order.
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    /// Number of tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if the suite has no tools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
