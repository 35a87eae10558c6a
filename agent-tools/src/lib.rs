//! Tool suites, capability modules, and the target-filtered plugin registry.
//!
//! A [`ToolPlugin`](plugin::ToolPlugin) is registered ahead of time with the
//! execution targets it supports. When a session is assembled the registry
//! instantiates the matching plugins into [`CapabilityModule`]s, and each
//! module turns the session context into a [`CapabilityContribution`] holding
//! one or more [`ToolSuite`]s.

#![warn(missing_docs, clippy::pedantic)]

pub mod builtin;
pub mod capability;
pub mod plugin;
pub mod suite;
pub mod tool;

pub use capability::{
    CapabilityContribution, CapabilityError, CapabilityModule, CapabilityResult,
    ContributionParts, Disposer, FnModule, ModuleRef, StaticModule,
};
pub use plugin::{PluginFilter, PluginOutcome, PluginYield, ToolPlugin, ToolPluginRegistry};
pub use suite::ToolSuite;
pub use tool::{Tool, ToolError, ToolHandle, ToolMetadata, ToolResult};
