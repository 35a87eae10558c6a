//! Capability modules and the contributions they produce.
//!
//! A [`CapabilityModule`] is the unit of contribution: given the session's
//! [`CapabilityContext`] it yields zero or one [`CapabilityContribution`].
//! Contributions that own external resources carry a [`Disposer`], which the
//! consumer runs exactly once when the session ends.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use agent_primitives::CapabilityContext;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

use crate::suite::ToolSuite;
use crate::tool::ToolError;

/// Result alias for capability operations.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Shared handle to a capability module.
pub type ModuleRef = Arc<dyn CapabilityModule>;

/// Errors raised while creating or disposing capabilities.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// A module failed to produce its contribution.
    #[error("capability module `{module}` failed: {reason}")]
    Creation {
        /// Module identifier.
        module: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A tool plugin's creation function failed.
    #[error("tool plugin `{plugin}` failed: {source}")]
    Plugin {
        /// Plugin identifier.
        plugin: String,
        /// Underlying failure.
        #[source]
        source: Box<CapabilityError>,
    },

    /// A contribution was built without any tool suite.
    #[error("contribution `{id}` must expose at least one tool suite")]
    EmptyContribution {
        /// Contribution identifier.
        id: String,
    },

    /// Disposing a contribution's resources failed.
    #[error("disposal failed: {reason}")]
    Disposal {
        /// Human-readable reason.
        reason: String,
    },

    /// Registry-level validation failed.
    #[error(transparent)]
    Registry(#[from] agent_primitives::Error),

    /// Tool construction failed.
    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl CapabilityError {
    /// Convenience constructor for module creation failures.
    #[must_use]
    pub fn creation(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Creation {
            module: module.into(),
            reason: reason.into(),
        }
    }

    /// Convenience constructor for disposal failures.
    #[must_use]
    pub fn disposal(reason: impl Into<String>) -> Self {
        Self::Disposal {
            reason: reason.into(),
        }
    }
}

/// One-shot asynchronous cleanup hook. Consuming `dispose` enforces the
/// at-most-once discipline at the type level.
pub struct Disposer(Box<dyn FnOnce() -> BoxFuture<'static, CapabilityResult<()>> + Send>);

impl Disposer {
    /// Wraps an async cleanup closure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = CapabilityResult<()>> + Send + 'static,
    {
        Self(Box::new(move || Box::pin(f())))
    }

    /// Runs the cleanup.
    ///
    /// # Errors
    ///
    /// Propagates whatever the cleanup reports.
    pub async fn dispose(self) -> CapabilityResult<()> {
        (self.0)().await
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Disposer")
    }
}

/// Realised output of a capability module.
#[derive(Debug)]
pub struct CapabilityContribution {
    id: String,
    description: String,
    suites: Vec<ToolSuite>,
    metadata: BTreeMap<String, Value>,
    disposer: Option<Disposer>,
}

impl CapabilityContribution {
    /// Creates a contribution exposing a single suite.
    #[must_use]
    pub fn new(id: impl Into<String>, description: impl Into<String>, suite: ToolSuite) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            suites: vec![suite],
            metadata: BTreeMap::new(),
            disposer: None,
        }
    }

    /// Creates a contribution from several suites.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::EmptyContribution`] when `suites` is empty.
    pub fn from_suites(
        id: impl Into<String>,
        description: impl Into<String>,
        suites: Vec<ToolSuite>,
    ) -> CapabilityResult<Self> {
        let id = id.into();
        if suites.is_empty() {
            return Err(CapabilityError::EmptyContribution { id });
        }
        Ok(Self {
            id,
            description: description.into(),
            suites,
            metadata: BTreeMap::new(),
            disposer: None,
        })
    }

    /// Adds another suite.
    #[must_use]
    pub fn with_suite(mut self, suite: ToolSuite) -> Self {
        self.suites.push(suite);
        self
    }

    /// Attaches a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Attaches the cleanup hook for resources owned by this contribution.
    #[must_use]
    pub fn with_disposer(mut self, disposer: Disposer) -> Self {
        self.disposer = Some(disposer);
        self
    }

    /// Returns the contribution id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the contributed suites.
    #[must_use]
    pub fn suites(&self) -> &[ToolSuite] {
        &self.suites
    }

    /// Returns the metadata mapping.
    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Returns `true` when a disposer is attached.
    #[must_use]
    pub fn has_disposer(&self) -> bool {
        self.disposer.is_some()
    }

    /// Splits the contribution into its parts, handing ownership of the
    /// disposer to the caller.
    #[must_use]
    pub fn into_parts(self) -> ContributionParts {
        ContributionParts {
            id: self.id,
            description: self.description,
            suites: self.suites,
            metadata: self.metadata,
            disposer: self.disposer,
        }
    }
}

/// Owned fields of a [`CapabilityContribution`].
#[derive(Debug)]
pub struct ContributionParts {
    /// Contribution id.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Contributed suites.
    pub suites: Vec<ToolSuite>,
    /// Free-form metadata.
    pub metadata: BTreeMap<String, Value>,
    /// Optional cleanup hook.
    pub disposer: Option<Disposer>,
}

/// A unit that contributes tools to a session once context is known.
#[async_trait]
pub trait CapabilityModule: Send + Sync {
    /// Stable module identifier.
    fn id(&self) -> &str;

    /// Produces this module's contribution for the session, or `None` when it
    /// has nothing to offer.
    async fn create(
        &self,
        context: &CapabilityContext,
    ) -> CapabilityResult<Option<CapabilityContribution>>;
}

impl fmt::Debug for dyn CapabilityModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CapabilityModule").field(&self.id()).finish()
    }
}

type ModuleFactory =
    dyn Fn(CapabilityContext) -> BoxFuture<'static, CapabilityResult<Option<CapabilityContribution>>>
        + Send
        + Sync;

/// Closure-backed [`CapabilityModule`].
pub struct FnModule {
    id: String,
    factory: Box<ModuleFactory>,
}

impl FnModule {
    /// Wraps an async closure. The closure receives an owned copy of the
    /// context.
    pub fn new<F, Fut>(id: impl Into<String>, f: F) -> Self
    where
        F: Fn(CapabilityContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CapabilityResult<Option<CapabilityContribution>>> + Send + 'static,
    {
        Self {
            id: id.into(),
            factory: Box::new(move |ctx| Box::pin(f(ctx))),
        }
    }

    /// Wraps the module in a shared handle.
    #[must_use]
    pub fn shared(self) -> ModuleRef {
        Arc::new(self)
    }
}

impl fmt::Debug for FnModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModule").field("id", &self.id).finish_non_exhaustive()
    }
}

#[async_trait]
impl CapabilityModule for FnModule {
    fn id(&self) -> &str {
        &self.id
    }

    async fn create(
        &self,
        context: &CapabilityContext,
    ) -> CapabilityResult<Option<CapabilityContribution>> {
        (self.factory)(context.clone()).await
    }
}

/// Module that always contributes a fixed set of suites and owns no
/// resources.
#[derive(Debug, Clone)]
pub struct StaticModule {
    id: String,
    description: String,
    suites: Vec<ToolSuite>,
}

impl StaticModule {
    /// Creates a static module.
    #[must_use]
    pub fn new(id: impl Into<String>, description: impl Into<String>, suites: Vec<ToolSuite>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            suites,
        }
    }
}

#[async_trait]
impl CapabilityModule for StaticModule {
    fn id(&self) -> &str {
        &self.id
    }

    async fn create(
        &self,
        _context: &CapabilityContext,
    ) -> CapabilityResult<Option<CapabilityContribution>> {
        if self.suites.is_empty() {
            return Ok(None);
        }
        CapabilityContribution::from_suites(&self.id, &self.description, self.suites.clone())
            .map(Some)
    }
}
