//! Predefined-macro maps produced by `-dM -E` dumps.

use std::collections::BTreeMap;

use serde::Serialize;

/// Mapping from macro name to its definition text (empty if defined without a value).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MacroMap {
    macros: BTreeMap<String, String>,
}

impl MacroMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the output of a macro dump (`#define NAME VALUE` per line).
    ///
    /// Lines that are not `#define` directives are skipped. Function-like
    /// macros keep their parameter list as part of the name.
    pub fn parse_dump(output: &str) -> Self {
        let mut macros = BTreeMap::new();
        for line in output.lines() {
            let Some(rest) = line.trim().strip_prefix("#define ") else {
                continue;
            };
            let (name, value) = match rest.split_once(' ') {
                Some((name, value)) => (name, value),
                None => (rest, ""),
            };
            if !name.is_empty() {
                macros.insert(name.to_string(), value.to_string());
            }
        }
        Self { macros }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.macros.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.macros.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Integer value of a numeric macro such as `__cplusplus` or a
    /// feature-test macro. Integer suffixes (`L`, `UL`, ...) are ignored.
    pub fn int_value(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(parse_int_macro)
    }

    /// Macros defined here that `base` does not define.
    pub fn difference(&self, base: &MacroMap) -> MacroMap {
        let macros = self
            .macros
            .iter()
            .filter(|(name, _)| !base.contains(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        MacroMap { macros }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.macros.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.macros.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MacroMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let macros = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        MacroMap { macros }
    }
}

fn parse_int_macro(token: &str) -> Option<i64> {
    token
        .trim()
        .trim_end_matches(['L', 'l', 'U', 'u'])
        .parse()
        .ok()
}
