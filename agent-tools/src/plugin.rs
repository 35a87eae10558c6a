//! Target-tagged tool plugins and their registry.
//!
//! Plugins register before any execution context exists. Their creation
//! functions run later, once the composition root knows the working directory,
//! environment, and target it is assembling for.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use agent_primitives::{
    CapabilityContext, DuplicatePolicy, KeyedRegistry, TargetSet, TargetTag, Targeted,
};
use futures::future::BoxFuture;
use tracing::debug;

use crate::capability::{CapabilityError, CapabilityResult, ModuleRef};

/// What a plugin's creation function may hand back.
pub enum PluginYield {
    /// The plugin has nothing to offer in this context.
    Nothing,
    /// A single module.
    One(ModuleRef),
    /// Several modules; absent entries are dropped.
    Many(Vec<Option<ModuleRef>>),
}

impl PluginYield {
    /// Flattens the yield into the modules it carries, preserving order.
    #[must_use]
    pub fn into_modules(self) -> Vec<ModuleRef> {
        match self {
            Self::Nothing => Vec::new(),
            Self::One(module) => vec![module],
            Self::Many(modules) => modules.into_iter().flatten().collect(),
        }
    }
}

impl fmt::Debug for PluginYield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => f.write_str("Nothing"),
            Self::One(module) => f.debug_tuple("One").field(&module.id()).finish(),
            Self::Many(modules) => {
                let ids: Vec<_> = modules.iter().map(|m| m.as_ref().map(|m| m.id())).collect();
                f.debug_tuple("Many").field(&ids).finish()
            }
        }
    }
}

impl From<ModuleRef> for PluginYield {
    fn from(value: ModuleRef) -> Self {
        Self::One(value)
    }
}

impl From<Option<ModuleRef>> for PluginYield {
    fn from(value: Option<ModuleRef>) -> Self {
        value.map_or(Self::Nothing, Self::One)
    }
}

impl From<Vec<ModuleRef>> for PluginYield {
    fn from(value: Vec<ModuleRef>) -> Self {
        Self::Many(value.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<ModuleRef>>> for PluginYield {
    fn from(value: Vec<Option<ModuleRef>>) -> Self {
        Self::Many(value)
    }
}

type PluginFactory =
    dyn Fn(CapabilityContext) -> BoxFuture<'static, CapabilityResult<PluginYield>> + Send + Sync;

/// Registry entry: a target-tagged factory for capability modules.
#[derive(Clone)]
pub struct ToolPlugin {
    id: String,
    description: Option<String>,
    targets: TargetSet,
    factory: Arc<PluginFactory>,
}

impl fmt::Debug for ToolPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolPlugin")
            .field("id", &self.id)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

impl ToolPlugin {
    /// Creates a universal plugin backed by an async creation function.
    pub fn new<F, Fut, Y>(id: impl Into<String>, create: F) -> Self
    where
        F: Fn(CapabilityContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CapabilityResult<Y>> + Send + 'static,
        Y: Into<PluginYield>,
    {
        let factory: Arc<PluginFactory> = Arc::new(move |ctx| {
            let fut = create(ctx);
            Box::pin(async move { fut.await.map(Into::into) })
        });

        Self {
            id: id.into(),
            description: None,
            targets: TargetSet::universal(),
            factory,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declares the targets this plugin applies to. Duplicates collapse and an
    /// empty declaration means `universal`.
    #[must_use]
    pub fn with_targets(mut self, targets: impl IntoIterator<Item = TargetTag>) -> Self {
        self.targets = TargetSet::new(targets);
        self
    }

    /// Returns the plugin id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Runs the creation function and flattens its yield.
    ///
    /// # Errors
    ///
    /// Propagates the creation function's failure.
    pub async fn create(&self, context: &CapabilityContext) -> CapabilityResult<Vec<ModuleRef>> {
        let produced = (self.factory)(context.clone()).await?;
        Ok(produced.into_modules())
    }
}

impl Targeted for ToolPlugin {
    fn targets(&self) -> &TargetSet {
        &self.targets
    }
}

/// Optional predicate narrowing which matching plugins get instantiated.
pub type PluginFilter<'a> = &'a (dyn Fn(&ToolPlugin) -> bool + Send + Sync);

/// Per-plugin result of [`ToolPluginRegistry::instantiate_isolated`].
#[derive(Debug)]
pub struct PluginOutcome {
    /// Plugin that was invoked.
    pub plugin_id: String,
    /// Modules it produced, or its failure.
    pub result: CapabilityResult<Vec<ModuleRef>>,
}

/// Registry of tool plugins keyed by id. Re-registration replaces the previous
/// entry without error.
#[derive(Debug)]
pub struct ToolPluginRegistry {
    plugins: KeyedRegistry<ToolPlugin>,
}

impl Default for ToolPluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolPluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            plugins: KeyedRegistry::new("tool plugin", DuplicatePolicy::Replace),
        }
    }

    /// Registers a plugin, replacing any existing entry with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Registry`] when the id is blank.
    pub fn register(&self, mut plugin: ToolPlugin) -> CapabilityResult<()> {
        let key = plugin.id.trim().to_owned();
        plugin.id.clone_from(&key);
        self.plugins.register(&key, plugin)?;
        debug!(plugin = %key, "tool plugin registered");
        Ok(())
    }

    /// Removes a plugin; no-op when absent.
    pub fn unregister(&self, id: &str) {
        if self.plugins.unregister(id).is_some() {
            debug!(plugin = %id, "tool plugin unregistered");
        }
    }

    /// Returns all registered plugins.
    #[must_use]
    pub fn list(&self) -> Vec<ToolPlugin> {
        self.plugins.values()
    }

    /// Looks up a plugin by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ToolPlugin> {
        self.plugins.find(id)
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` if no plugin is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Removes every plugin.
    pub fn clear(&self) {
        self.plugins.clear();
    }

    fn select(&self, target: TargetTag, filter: Option<PluginFilter<'_>>) -> Vec<ToolPlugin> {
        self.plugins
            .matching(target)
            .into_iter()
            .map(|(_, plugin)| plugin)
            .filter(|plugin| filter.is_none_or(|accept| accept(plugin)))
            .collect()
    }

    /// Invokes every plugin applicable to `target` in registration order and
    /// returns the flattened modules in invocation order.
    ///
    /// # Errors
    ///
    /// The first failing plugin aborts the call with
    /// [`CapabilityError::Plugin`] naming it.
    pub async fn instantiate(
        &self,
        target: TargetTag,
        context: &CapabilityContext,
        filter: Option<PluginFilter<'_>>,
    ) -> CapabilityResult<Vec<ModuleRef>> {
        let mut modules = Vec::new();
        for plugin in self.select(target, filter) {
            let produced = plugin.create(context).await.map_err(|source| CapabilityError::Plugin {
                plugin: plugin.id.clone(),
                source: Box::new(source),
            })?;
            debug!(plugin = %plugin.id, %target, modules = produced.len(), "tool plugin instantiated");
            modules.extend(produced);
        }
        Ok(modules)
    }

    /// Like [`instantiate`](Self::instantiate) but keeps going past failures,
    /// reporting one outcome per invoked plugin.
    pub async fn instantiate_isolated(
        &self,
        target: TargetTag,
        context: &CapabilityContext,
        filter: Option<PluginFilter<'_>>,
    ) -> Vec<PluginOutcome> {
        let mut outcomes = Vec::new();
        for plugin in self.select(target, filter) {
            let result = plugin.create(context).await;
            outcomes.push(PluginOutcome {
                plugin_id: plugin.id.clone(),
                result,
            });
        }
        outcomes
    }
}
