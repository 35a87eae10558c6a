//! Session assembly for tool-using agents.
//!
//! A [`UniversalRuntime`] pairs a [`RuntimeAdapter`] (what the execution
//! target always carries) with the shared
//! [`ToolPluginRegistry`](agent_tools::ToolPluginRegistry). Calling
//! [`UniversalRuntime::assemble`] resolves the session context, creates every
//! module once in a fixed order, and returns a [`RuntimeSession`] whose
//! [`close`](RuntimeSession::close) releases owned resources newest first.
//!
//! [`SessionBootstrap`] handles the model side: it resolves a profile and
//! builds the provider client the session talks to.

#![warn(missing_docs, clippy::pedantic)]

mod adapter;
mod bootstrap;
mod browser;
pub mod cloud;
mod error;
mod node;
mod runtime;
mod transport;

pub use adapter::RuntimeAdapter;
pub use bootstrap::{BootstrappedModel, ModelOverrides, SessionBootstrap};
pub use browser::BrowserAdapter;
pub use cloud::{
    CloudAdapter, REMOTE_MODULE_ID, RemoteCapabilityModule, RemoteSuiteDescriptor,
    RemoteToolDescriptor, RemoteTransport,
};
pub use error::{RuntimeError, RuntimeResult};
pub use node::NodeAdapter;
pub use runtime::{
    AssemblyFailure, AssemblyReport, DisposalFailure, DisposalReport, FailureSource,
    PluginPredicate, RuntimeOptions, RuntimeSession, ToolSet, ToolSetEntry, UniversalRuntime,
};
pub use transport::HttpRemoteTransport;
