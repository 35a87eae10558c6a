//! Keyed registry shared by providers, profiles, and tool plugins.
//!
//! Each registry is an explicit object owning its own store. Callers construct
//! one per process (or per test), share it behind an `Arc`, and pass it to the
//! call sites that register or look up entries. Enumeration follows
//! registration order; replacing an entry keeps its original position.

use std::fmt;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::target::{TargetSet, TargetTag};

/// How a registry reacts when an id is registered twice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail with [`Error::Conflict`] unless an override is explicitly requested.
    Reject,
    /// Last registration wins silently.
    Replace,
}

/// Values that declare which execution targets they apply to.
pub trait Targeted {
    /// Returns the normalised target set.
    fn targets(&self) -> &TargetSet;
}

/// Registry mapping trimmed string ids to values.
pub struct KeyedRegistry<V> {
    kind: &'static str,
    policy: DuplicatePolicy,
    entries: RwLock<IndexMap<String, V>>,
}

impl<V> fmt::Debug for KeyedRegistry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        let ids: Vec<_> = entries.keys().cloned().collect();
        f.debug_struct("KeyedRegistry")
            .field("kind", &self.kind)
            .field("policy", &self.policy)
            .field("registered", &ids)
            .finish()
    }
}

impl<V: Clone> KeyedRegistry<V> {
    /// Creates an empty registry. `kind` names the entries in error messages.
    #[must_use]
    pub fn new(kind: &'static str, policy: DuplicatePolicy) -> Self {
        Self {
            kind,
            policy,
            entries: RwLock::new(IndexMap::new()),
        }
    }

    /// Returns the entry kind used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// Returns the duplicate policy.
    #[must_use]
    pub const fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Registers `value` under `id`, returning the trimmed key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlankId`] for blank ids, and [`Error::Conflict`] when the
    /// id exists and the policy is [`DuplicatePolicy::Reject`].
    pub fn register(&self, id: impl AsRef<str>, value: V) -> Result<String> {
        self.insert(id.as_ref(), value, self.policy == DuplicatePolicy::Replace)
    }

    /// Registers `value` under `id`, replacing any existing entry regardless of
    /// policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlankId`] for blank ids.
    pub fn register_with_override(&self, id: impl AsRef<str>, value: V) -> Result<String> {
        self.insert(id.as_ref(), value, true)
    }

    fn insert(&self, id: &str, value: V, allow_replace: bool) -> Result<String> {
        let key = id.trim();
        if key.is_empty() {
            return Err(Error::BlankId { kind: self.kind });
        }

        let mut entries = self.entries.write();
        if !allow_replace && entries.contains_key(key) {
            return Err(Error::Conflict {
                kind: self.kind,
                id: key.to_owned(),
            });
        }
        entries.insert(key.to_owned(), value);
        Ok(key.to_owned())
    }

    /// Removes the entry under `id`, returning it if present.
    pub fn unregister(&self, id: &str) -> Option<V> {
        self.entries.write().shift_remove(id.trim())
    }

    /// Looks up an entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] listing every registered id (sorted) when
    /// nothing matches.
    pub fn get(&self, id: &str) -> Result<V> {
        let entries = self.entries.read();
        entries.get(id.trim()).cloned().ok_or_else(|| {
            let mut known: Vec<String> = entries.keys().cloned().collect();
            known.sort();
            Error::NotFound {
                kind: self.kind,
                id: id.to_owned(),
                known,
            }
        })
    }

    /// Looks up an entry without building a diagnostic.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<V> {
        self.entries.read().get(id.trim()).cloned()
    }

    /// Returns `true` if `id` is registered.
    #[must_use]
    pub fn has(&self, id: &str) -> bool {
        self.entries.read().contains_key(id.trim())
    }

    /// Returns registered ids in registration order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Returns registered ids sorted lexicographically.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<String> {
        let mut ids = self.ids();
        ids.sort();
        ids
    }

    /// Returns a snapshot of all `(id, value)` pairs in registration order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, V)> {
        self.entries
            .read()
            .iter()
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect()
    }

    /// Returns a snapshot of all values in registration order.
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.entries.read().values().cloned().collect()
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes every entry. Intended for process shutdown and test teardown.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl<V: Clone + Targeted> KeyedRegistry<V> {
    /// Snapshot of entries whose targets include `target` or `universal`, in
    /// registration order.
    #[must_use]
    pub fn matching(&self, target: TargetTag) -> Vec<(String, V)> {
        self.entries
            .read()
            .iter()
            .filter(|(_, value)| value.targets().matches(target))
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Entry {
        value: u32,
        targets: TargetSet,
    }

    impl Targeted for Entry {
        fn targets(&self) -> &TargetSet {
            &self.targets
        }
    }

    fn entry(value: u32, tags: &[TargetTag]) -> Entry {
        Entry {
            value,
            targets: TargetSet::new(tags.iter().copied()),
        }
    }

    #[test]
    fn reject_policy_requires_override() {
        let registry = KeyedRegistry::new("provider", DuplicatePolicy::Reject);
        registry.register("openai", 1).unwrap();

        let err = registry.register("openai", 2).expect_err("duplicate");
        assert!(matches!(err, Error::Conflict { ref id, .. } if id == "openai"));
        assert!(err.to_string().contains("openai"));

        registry.register_with_override("openai", 3).unwrap();
        assert_eq!(registry.get("openai").unwrap(), 3);
    }

    #[test]
    fn replace_policy_keeps_position() {
        let registry = KeyedRegistry::new("plugin", DuplicatePolicy::Replace);
        registry.register("a", 1).unwrap();
        registry.register("b", 2).unwrap();
        registry.register("a", 10).unwrap();

        assert_eq!(registry.ids(), vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(registry.get("a").unwrap(), 10);
    }

    #[test]
    fn blank_ids_rejected_and_keys_trimmed() {
        let registry = KeyedRegistry::new("profile", DuplicatePolicy::Reject);
        let err = registry.register("   ", 1).expect_err("blank");
        assert!(matches!(err, Error::BlankId { kind: "profile" }));

        let key = registry.register("  coder ", 1).unwrap();
        assert_eq!(key, "coder");
        assert!(registry.has("coder"));
    }

    #[test]
    fn not_found_lists_sorted_ids() {
        let registry = KeyedRegistry::new("provider", DuplicatePolicy::Reject);
        registry.register("zeta", 1).unwrap();
        registry.register("alpha", 2).unwrap();

        let err = registry.get("missing").expect_err("missing");
        match &err {
            Error::NotFound { known, .. } => {
                assert_eq!(known, &vec!["alpha".to_owned(), "zeta".to_owned()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("[alpha, zeta]"));
    }

    #[test]
    fn unregister_is_noop_when_absent() {
        let registry: KeyedRegistry<u32> = KeyedRegistry::new("plugin", DuplicatePolicy::Replace);
        assert!(registry.unregister("ghost").is_none());
        registry.register("a", 1).unwrap();
        assert_eq!(registry.unregister("a"), Some(1));
        assert!(registry.is_empty());
    }

    #[test]
    fn matching_filters_by_target() {
        let registry = KeyedRegistry::new("plugin", DuplicatePolicy::Replace);
        registry.register("node-only", entry(1, &[TargetTag::Node])).unwrap();
        registry.register("anywhere", entry(2, &[])).unwrap();
        registry.register("browser-only", entry(3, &[TargetTag::Browser])).unwrap();

        let node: Vec<_> = registry
            .matching(TargetTag::Node)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(node, vec!["node-only".to_owned(), "anywhere".to_owned()]);

        let browser: Vec<_> = registry
            .matching(TargetTag::Browser)
            .into_iter()
            .map(|(_, e)| e.value)
            .collect();
        assert_eq!(browser, vec![2, 3]);
    }
}
