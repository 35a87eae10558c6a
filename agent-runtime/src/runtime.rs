//! Composition root: turns an adapter, the plugin registry, and caller modules
//! into one session-scoped tool set.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use agent_adapters::{ToolCall, ToolDeclaration};
use agent_primitives::{CapabilityContext, SessionId, TargetTag};
use agent_tools::{
    ContributionParts, Disposer, ModuleRef, ToolError, ToolPlugin, ToolPluginRegistry, ToolResult,
    ToolSuite,
};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::adapter::RuntimeAdapter;
use crate::error::{RuntimeError, RuntimeResult};
use crate::node::NodeAdapter;

/// Shared predicate selecting which matching plugins a session instantiates.
pub type PluginPredicate = Arc<dyn Fn(&ToolPlugin) -> bool + Send + Sync>;

/// Inputs for [`UniversalRuntime::assemble`]. Unset fields fall back to the
/// current process: its working directory, its environment, and the
/// `default` profile.
#[derive(Clone, Default)]
pub struct RuntimeOptions {
    profile: Option<String>,
    workspace_context: Option<String>,
    working_dir: Option<PathBuf>,
    env: Option<BTreeMap<String, String>>,
    additional_modules: Vec<ModuleRef>,
    plugin_filter: Option<PluginPredicate>,
}

impl fmt::Debug for RuntimeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modules: Vec<_> = self.additional_modules.iter().map(|m| m.id()).collect();
        f.debug_struct("RuntimeOptions")
            .field("profile", &self.profile)
            .field("working_dir", &self.working_dir)
            .field("additional_modules", &modules)
            .field("filtered", &self.plugin_filter.is_some())
            .finish_non_exhaustive()
    }
}

impl RuntimeOptions {
    /// Options that inherit everything from the current process.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects a profile.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Attaches a free-form workspace context string.
    #[must_use]
    pub fn with_workspace_context(mut self, context: impl Into<String>) -> Self {
        self.workspace_context = Some(context.into());
        self
    }

    /// Pins the working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Replaces the process environment with an explicit mapping.
    #[must_use]
    pub fn with_env(mut self, env: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env = Some(env.into_iter().collect());
        self
    }

    /// Appends a module invoked after adapter and plugin modules.
    #[must_use]
    pub fn with_module(mut self, module: ModuleRef) -> Self {
        self.additional_modules.push(module);
        self
    }

    /// Appends several modules.
    #[must_use]
    pub fn with_modules(mut self, modules: impl IntoIterator<Item = ModuleRef>) -> Self {
        self.additional_modules.extend(modules);
        self
    }

    /// Only plugins accepted by `filter` are instantiated.
    #[must_use]
    pub fn with_plugin_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&ToolPlugin) -> bool + Send + Sync + 'static,
    {
        self.plugin_filter = Some(Arc::new(filter));
        self
    }

    fn resolve_context(&self) -> RuntimeResult<CapabilityContext> {
        let working_dir = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(RuntimeError::WorkingDir)?,
        };
        let env = self
            .env
            .clone()
            .unwrap_or_else(|| std::env::vars().collect());

        let mut builder = CapabilityContext::builder(working_dir).env(env);
        if let Some(profile) = &self.profile {
            builder = builder.profile(profile.clone());
        }
        if let Some(context) = &self.workspace_context {
            builder = builder.workspace_context(context.clone());
        }
        Ok(builder.build())
    }
}

/// Suites contributed under one contribution id.
#[derive(Clone, Debug)]
pub struct ToolSetEntry {
    description: String,
    metadata: BTreeMap<String, Value>,
    suites: Vec<ToolSuite>,
}

impl ToolSetEntry {
    /// Returns the contribution description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the contribution metadata.
    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Returns the suites in contribution order.
    #[must_use]
    pub fn suites(&self) -> &[ToolSuite] {
        &self.suites
    }
}

/// Merged tool suites of a session, keyed by contribution id in the order the
/// contributions arrived.
#[derive(Clone, Debug, Default)]
pub struct ToolSet {
    entries: IndexMap<String, ToolSetEntry>,
}

impl ToolSet {
    /// Adds a contribution's suites. A repeated id keeps its position and
    /// gains the new suites; returns `false` in that case.
    fn insert(&mut self, parts: &mut ContributionParts) -> bool {
        let suites = std::mem::take(&mut parts.suites);
        if let Some(entry) = self.entries.get_mut(&parts.id) {
            entry.suites.extend(suites);
            entry.metadata.append(&mut parts.metadata);
            return false;
        }
        self.entries.insert(
            parts.id.clone(),
            ToolSetEntry {
                description: std::mem::take(&mut parts.description),
                metadata: std::mem::take(&mut parts.metadata),
                suites,
            },
        );
        true
    }

    /// Returns the entry for a contribution id.
    #[must_use]
    pub fn get(&self, contribution: &str) -> Option<&ToolSetEntry> {
        self.entries.get(contribution)
    }

    /// Iterates contribution ids in arrival order.
    pub fn contribution_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates every suite across all contributions.
    pub fn suites(&self) -> impl Iterator<Item = &ToolSuite> {
        self.entries.values().flat_map(|entry| entry.suites.iter())
    }

    /// Returns the first suite with the given id.
    #[must_use]
    pub fn suite(&self, id: &str) -> Option<&ToolSuite> {
        self.suites().find(|suite| suite.id() == id)
    }

    /// Returns all suite ids in order.
    #[must_use]
    pub fn suite_ids(&self) -> Vec<&str> {
        self.suites().map(ToolSuite::id).collect()
    }

    /// Declares every tool for a model request, named `suite__tool`.
    #[must_use]
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.suites()
            .flat_map(|suite| {
                suite.list().into_iter().map(move |tool| {
                    ToolDeclaration::qualified(suite.id(), tool.name(), tool.description())
                        .with_parameters(tool.input_schema().clone())
                })
            })
            .collect()
    }

    /// Runs a tool the model called by its declared name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] when no tool was declared under
    /// `call.name`, otherwise propagates the tool's failure.
    pub async fn invoke_call(&self, call: &ToolCall) -> ToolResult<Value> {
        let found = self.suites().find_map(|suite| {
            suite
                .tool_names()
                .find(|tool| ToolDeclaration::qualified(suite.id(), tool, "").name() == call.name)
                .map(|tool| (suite, tool.to_owned()))
        });
        let (suite, tool) = found.ok_or_else(|| ToolError::UnknownTool {
            name: call.name.clone(),
        })?;
        suite.invoke(&tool, call.arguments.clone()).await
    }

    /// Invokes `tool` in the first suite named `suite`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] when the suite or tool is missing,
    /// otherwise propagates the tool's failure.
    pub async fn invoke(&self, suite: &str, tool: &str, input: Value) -> ToolResult<Value> {
        let target = self.suite(suite).ok_or_else(|| ToolError::UnknownTool {
            name: format!("{suite}.{tool}"),
        })?;
        target.invoke(tool, input).await
    }

    /// Number of contributions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing was contributed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where an assembly failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureSource {
    /// The runtime adapter could not produce its base modules.
    Adapter,
    /// A tool plugin's creation function failed.
    Plugin,
    /// A capability module failed to create its contribution.
    Module,
}

impl fmt::Display for FailureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Adapter => "adapter",
            Self::Plugin => "plugin",
            Self::Module => "module",
        })
    }
}

/// One isolated failure during assembly.
#[derive(Clone, Debug)]
pub struct AssemblyFailure {
    /// Failing stage.
    pub source: FailureSource,
    /// Adapter target, plugin id, or module id.
    pub id: String,
    /// Rendered error.
    pub message: String,
}

/// What happened while assembling a session.
#[derive(Clone, Debug, Default)]
pub struct AssemblyReport {
    /// Contribution ids that made it into the tool set.
    pub contributed: Vec<String>,
    /// Module ids that had nothing to contribute.
    pub skipped: Vec<String>,
    /// Failures that were logged and left out.
    pub failures: Vec<AssemblyFailure>,
}

impl AssemblyReport {
    fn record(&mut self, source: FailureSource, id: impl Into<String>, error: &dyn fmt::Display) {
        let id = id.into();
        warn!(%source, id = %id, error = %error, "capability left out of session");
        self.failures.push(AssemblyFailure {
            source,
            id,
            message: error.to_string(),
        });
    }

    /// Returns `true` when nothing failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A disposer that reported failure.
#[derive(Clone, Debug)]
pub struct DisposalFailure {
    /// Contribution the disposer belonged to.
    pub contribution: String,
    /// Rendered error.
    pub message: String,
}

/// Outcome of [`RuntimeSession::close`].
#[derive(Clone, Debug, Default)]
pub struct DisposalReport {
    /// Number of disposers run.
    pub attempted: usize,
    /// Disposers that failed.
    pub failures: Vec<DisposalFailure>,
}

impl DisposalReport {
    /// Returns `true` when every disposer succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// An assembled session: the merged tool set plus the cleanup hooks of every
/// contribution that owns resources.
pub struct RuntimeSession {
    id: SessionId,
    target: TargetTag,
    context: CapabilityContext,
    tools: ToolSet,
    report: AssemblyReport,
    disposers: Vec<(String, Disposer)>,
}

impl fmt::Debug for RuntimeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeSession")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("contributions", &self.tools.len())
            .field("pending_disposers", &self.disposers.len())
            .finish_non_exhaustive()
    }
}

impl RuntimeSession {
    /// Returns the session id.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the execution target.
    #[must_use]
    pub const fn target(&self) -> TargetTag {
        self.target
    }

    /// Returns the context every module received.
    #[must_use]
    pub fn context(&self) -> &CapabilityContext {
        &self.context
    }

    /// Returns the merged tool set.
    #[must_use]
    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Returns the assembly report.
    #[must_use]
    pub fn report(&self) -> &AssemblyReport {
        &self.report
    }

    /// Runs every disposer once, newest first, continuing past failures.
    /// Later calls find nothing left to run.
    pub async fn close(&mut self) -> DisposalReport {
        let disposers = std::mem::take(&mut self.disposers);
        let mut report = DisposalReport {
            attempted: disposers.len(),
            failures: Vec::new(),
        };

        for (contribution, disposer) in disposers.into_iter().rev() {
            match disposer.dispose().await {
                Ok(()) => debug!(session_id = %self.id, contribution = %contribution, "disposed"),
                Err(err) => report.failures.push(DisposalFailure {
                    contribution,
                    message: err.to_string(),
                }),
            }
        }

        if report.is_clean() {
            info!(session_id = %self.id, disposed = report.attempted, "session closed");
        } else {
            let failed: Vec<&str> = report
                .failures
                .iter()
                .map(|failure| failure.contribution.as_str())
                .collect();
            warn!(
                session_id = %self.id,
                attempted = report.attempted,
                failed = ?failed,
                "session closed with disposal failures"
            );
        }
        report
    }
}

impl Drop for RuntimeSession {
    fn drop(&mut self) {
        if !self.disposers.is_empty() {
            warn!(
                session_id = %self.id,
                pending = self.disposers.len(),
                "runtime session dropped without close; resources were not disposed"
            );
        }
    }
}

/// Assembles sessions for one execution target.
#[derive(Clone)]
pub struct UniversalRuntime {
    adapter: Arc<dyn RuntimeAdapter>,
    plugins: Arc<ToolPluginRegistry>,
}

impl fmt::Debug for UniversalRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniversalRuntime")
            .field("target", &self.adapter.target())
            .field("plugins", &self.plugins)
            .finish()
    }
}

impl UniversalRuntime {
    /// Creates a runtime over `adapter` and a shared plugin registry.
    #[must_use]
    pub fn new(adapter: Arc<dyn RuntimeAdapter>, plugins: Arc<ToolPluginRegistry>) -> Self {
        Self { adapter, plugins }
    }

    /// Node runtime whose adapter registers defaults into `plugins`.
    #[must_use]
    pub fn node(plugins: Arc<ToolPluginRegistry>) -> Self {
        let adapter = Arc::new(NodeAdapter::new(Arc::clone(&plugins)));
        Self::new(adapter, plugins)
    }

    /// Returns the adapter's target.
    #[must_use]
    pub fn target(&self) -> TargetTag {
        self.adapter.target()
    }

    /// Returns the plugin registry.
    #[must_use]
    pub fn plugins(&self) -> &Arc<ToolPluginRegistry> {
        &self.plugins
    }

    /// Builds a session: adapter modules, then matching plugins, then
    /// `options`' modules, each created once in that order. Failing plugins
    /// and modules are logged, reported, and left out.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::WorkingDir`] when no working directory was
    /// given and the process one cannot be read.
    pub async fn assemble(&self, options: RuntimeOptions) -> RuntimeResult<RuntimeSession> {
        let context = options.resolve_context()?;
        let id = SessionId::random();
        let target = self.adapter.target();
        let span = info_span!("assemble", session_id = %id, %target, profile = %context.profile());

        self.assemble_in(id, context, options).instrument(span).await
    }

    async fn assemble_in(
        &self,
        id: SessionId,
        context: CapabilityContext,
        options: RuntimeOptions,
    ) -> RuntimeResult<RuntimeSession> {
        let target = self.adapter.target();
        let mut report = AssemblyReport::default();
        let mut modules: Vec<ModuleRef> = Vec::new();

        match self.adapter.base_modules(&context).await {
            Ok(base) => modules.extend(base),
            Err(err) => report.record(FailureSource::Adapter, target.as_str(), &err),
        }

        let filter = options.plugin_filter.as_deref();
        for outcome in self.plugins.instantiate_isolated(target, &context, filter).await {
            match outcome.result {
                Ok(produced) => modules.extend(produced),
                Err(err) => report.record(FailureSource::Plugin, outcome.plugin_id, &err),
            }
        }

        modules.extend(options.additional_modules);
        debug!(modules = modules.len(), "capability modules collected");

        let mut tools = ToolSet::default();
        let mut disposers = Vec::new();
        for module in modules {
            let module_id = module.id().to_owned();
            let contribution = match module.create(&context).await {
                Ok(Some(contribution)) => contribution,
                Ok(None) => {
                    debug!(module = %module_id, "module contributed nothing");
                    report.skipped.push(module_id);
                    continue;
                }
                Err(err) => {
                    report.record(FailureSource::Module, module_id, &err);
                    continue;
                }
            };

            let mut parts = contribution.into_parts();
            if tools.insert(&mut parts) {
                report.contributed.push(parts.id.clone());
            } else {
                warn!(contribution = %parts.id, module = %module_id, "duplicate contribution id; suites merged");
            }
            if let Some(disposer) = parts.disposer.take() {
                disposers.push((parts.id, disposer));
            }
        }

        info!(
            contributions = tools.len(),
            suites = tools.suites().count(),
            failures = report.failures.len(),
            "session assembled"
        );

        Ok(RuntimeSession {
            id,
            target,
            context,
            tools,
            report,
            disposers,
        })
    }
}
