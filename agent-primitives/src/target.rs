//! Execution-environment target tags.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Classifies the host environment a capability can run in.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetTag {
    /// Local process with filesystem and subprocess access.
    Node,
    /// In-browser sandbox.
    Browser,
    /// Remote execution surface reached over a transport.
    Cloud,
    /// Matches any requested target.
    Universal,
}

impl TargetTag {
    /// All tags, in declaration order.
    pub const ALL: [Self; 4] = [Self::Node, Self::Browser, Self::Cloud, Self::Universal];

    /// Returns the lowercase tag name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Browser => "browser",
            Self::Cloud => "cloud",
            Self::Universal => "universal",
        }
    }
}

impl fmt::Display for TargetTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "node" => Ok(Self::Node),
            "browser" => Ok(Self::Browser),
            "cloud" => Ok(Self::Cloud),
            "universal" => Ok(Self::Universal),
            _ => Err(Error::InvalidTarget { value: s.to_owned() }),
        }
    }
}

/// De-duplicated set of target tags. An empty declaration normalises to
/// `{universal}`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<TargetTag>", into = "Vec<TargetTag>")]
pub struct TargetSet(BTreeSet<TargetTag>);

impl TargetSet {
    /// Builds a normalised set from any collection of tags.
    #[must_use]
    pub fn new(tags: impl IntoIterator<Item = TargetTag>) -> Self {
        let mut set: BTreeSet<TargetTag> = tags.into_iter().collect();
        if set.is_empty() {
            set.insert(TargetTag::Universal);
        }
        Self(set)
    }

    /// The implicit `{universal}` set.
    #[must_use]
    pub fn universal() -> Self {
        Self::new([TargetTag::Universal])
    }

    /// Returns `true` when an entry tagged with this set should be offered to
    /// `target`.
    #[must_use]
    pub fn matches(&self, target: TargetTag) -> bool {
        self.0.contains(&target) || self.0.contains(&TargetTag::Universal)
    }

    /// Returns `true` if the exact tag is present.
    #[must_use]
    pub fn contains(&self, tag: TargetTag) -> bool {
        self.0.contains(&tag)
    }

    /// Iterates the tags in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = TargetTag> + '_ {
        self.0.iter().copied()
    }

    /// Number of distinct tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; normalisation guarantees at least one tag.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for TargetSet {
    fn default() -> Self {
        Self::universal()
    }
}

impl From<Vec<TargetTag>> for TargetSet {
    fn from(value: Vec<TargetTag>) -> Self {
        Self::new(value)
    }
}

impl From<TargetSet> for Vec<TargetTag> {
    fn from(value: TargetSet) -> Self {
        value.0.into_iter().collect()
    }
}

impl FromIterator<TargetTag> for TargetSet {
    fn from_iter<I: IntoIterator<Item = TargetTag>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_declaration_is_universal() {
        let set = TargetSet::new([]);
        assert_eq!(set, TargetSet::universal());
        for target in TargetTag::ALL {
            assert!(set.matches(target));
        }
    }

    #[test]
    fn duplicates_collapse() {
        let set = TargetSet::new([TargetTag::Node, TargetTag::Node, TargetTag::Cloud]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn node_only_never_matches_browser() {
        let set = TargetSet::new([TargetTag::Node]);
        assert!(set.matches(TargetTag::Node));
        assert!(!set.matches(TargetTag::Browser));
        assert!(!set.matches(TargetTag::Cloud));
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Browser".parse::<TargetTag>().unwrap(), TargetTag::Browser);
        let err = "desktop".parse::<TargetTag>().expect_err("unknown");
        assert!(matches!(err, Error::InvalidTarget { value } if value == "desktop"));
    }
}
