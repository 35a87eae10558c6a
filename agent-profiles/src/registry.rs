//! Named profile store with JSON bulk loading.

use std::sync::Arc;

use agent_primitives::{DuplicatePolicy, KeyedRegistry};
use serde::Deserialize;
use tracing::debug;

use crate::blueprint::AgentBlueprint;
use crate::error::ProfileResult;

/// Registry of frozen agent blueprints keyed by trimmed name. Names are
/// registered at most once.
#[derive(Debug)]
pub struct ProfileRegistry {
    profiles: KeyedRegistry<Arc<AgentBlueprint>>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileDocument {
    Many(Vec<AgentBlueprint>),
    Wrapped { profiles: Vec<AgentBlueprint> },
}

impl ProfileRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            profiles: KeyedRegistry::new("profile", DuplicatePolicy::Reject),
        }
    }

    /// Validates, freezes, and stores `blueprint`.
    ///
    /// # Errors
    ///
    /// Fails for blank names, invalid fields, or a name that is already
    /// registered.
    pub fn register(&self, blueprint: AgentBlueprint) -> ProfileResult<Arc<AgentBlueprint>> {
        let frozen = Arc::new(blueprint.validate()?);
        self.profiles.register(frozen.name(), Arc::clone(&frozen))?;
        debug!(profile = %frozen.name(), provider = %frozen.provider(), "profile registered");
        Ok(frozen)
    }

    /// Registers every profile in a JSON document: either an array of
    /// blueprints or `{ "profiles": [...] }`. Stops at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Decode`](crate::ProfileError::Decode) for
    /// malformed JSON, otherwise the first registration failure.
    pub fn register_json(&self, document: &str) -> ProfileResult<usize> {
        let blueprints = match serde_json::from_str::<ProfileDocument>(document)? {
            ProfileDocument::Many(list) | ProfileDocument::Wrapped { profiles: list } => list,
        };
        let count = blueprints.len();
        for blueprint in blueprints {
            self.register(blueprint)?;
        }
        Ok(count)
    }

    /// Resolves a profile by name.
    ///
    /// # Errors
    ///
    /// Fails with every registered name when nothing matches.
    pub fn get(&self, name: &str) -> ProfileResult<Arc<AgentBlueprint>> {
        Ok(self.profiles.get(name)?)
    }

    /// Returns all profiles in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<AgentBlueprint>> {
        self.profiles.values()
    }

    /// Returns registered names sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.profiles.sorted_ids()
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.profiles.has(name)
    }

    /// Removes every profile.
    pub fn clear(&self) {
        self.profiles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProfileError;

    fn blueprint(name: &str) -> AgentBlueprint {
        AgentBlueprint::builder(name)
            .system_prompt("prompt")
            .provider("openai")
            .model("gpt-4o")
            .build()
            .unwrap()
    }

    #[test]
    fn lookup_uses_trimmed_name() {
        let registry = ProfileRegistry::new();
        registry.register(blueprint(" planner ")).unwrap();
        assert!(registry.has("planner"));
        assert_eq!(registry.get("planner").unwrap().model(), "gpt-4o");
    }

    #[test]
    fn duplicates_rejected() {
        let registry = ProfileRegistry::new();
        registry.register(blueprint("planner")).unwrap();
        let err = registry.register(blueprint("planner")).expect_err("duplicate");
        assert!(err.to_string().contains("planner"));
    }

    #[test]
    fn unknown_profile_lists_names() {
        let registry = ProfileRegistry::new();
        registry.register(blueprint("writer")).unwrap();
        registry.register(blueprint("coder")).unwrap();

        let err = registry.get("ghost").expect_err("unknown");
        assert!(matches!(err, ProfileError::Registry(_)));
        assert!(err.to_string().contains("[coder, writer]"));
    }

    #[test]
    fn registers_json_documents() {
        let registry = ProfileRegistry::new();
        let count = registry
            .register_json(
                r#"{ "profiles": [
                    { "name": "a", "system_prompt": "A", "provider": "openai", "model": "m" },
                    { "name": "b", "system_prompt": "B", "provider": "ollama", "model": "n", "rulebook": "rules/b.md" }
                ] }"#,
            )
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(registry.get("b").unwrap().rulebook(), Some("rules/b.md"));
        assert_eq!(registry.names(), vec!["a".to_owned(), "b".to_owned()]);
    }
}
