//! The feature set: opaque tokens that test files query to decide applicability.

use std::collections::BTreeSet;

use serde::Serialize;

/// A monotonic set of feature tokens.
///
/// Features are only ever added. There is deliberately no removal
/// operation; when two stages disagree, flag order decides the
/// compiler's behavior but the feature set stays additive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureSet {
    tokens: BTreeSet<String>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a token. Empty tokens are ignored.
    pub fn add(&mut self, token: impl Into<String>) {
        let token = token.into();
        if !token.is_empty() {
            self.tokens.insert(token);
        }
    }

    pub fn add_all<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for token in tokens {
            self.add(token);
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// Add every token of `other`.
    pub fn union(&mut self, other: &FeatureSet) {
        self.tokens.extend(other.tokens.iter().cloned());
    }

    /// Iterate over all tokens. Consumers must not rely on the order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = FeatureSet::new();
        set.add_all(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_contains() {
        let mut f = FeatureSet::new();
        f.add("libc++");
        f.add("libc++");
        f.add("");
        assert!(f.contains("libc++"));
        assert!(!f.contains("libstdc++"));
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn union_is_additive() {
        let mut a: FeatureSet = ["asan", "ubsan"].into_iter().collect();
        let b: FeatureSet = ["ubsan", "long_tests"].into_iter().collect();
        a.union(&b);
        assert_eq!(a.len(), 3);
        assert!(a.contains("long_tests"));
        assert_eq!(b.len(), 2);
    }
}
