//! Target triple normalization.
//!
//! Test files match triples exactly, so version suffixes the compiler
//! reports (`darwin14.0.0`) are collapsed to the major OS version.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// arch-vendor-os, splitting the OS into its major version and the rest.
static TRIPLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([^-]+)-([^-]+)-([^.]+)([^-]*)(.*)").expect("triple pattern is valid")
});

/// Linux vendors whose compilers drop the `-gnu` environment.
const GLIBC_VENDOR_SUFFIXES: [&str; 2] = ["redhat-linux", "suse-linux"];

/// Normalize a compiler-reported triple.
///
/// Keeps the architecture, vendor, OS with its major version, and any
/// remaining components; `x86_64-apple-darwin14.0.0` becomes
/// `x86_64-apple-darwin14`. Red Hat and SUSE triples gain `-gnu`.
pub fn normalize_triple(raw: &str) -> String {
    let raw = raw.trim();
    let mut triple = TRIPLE_RE.replace(raw, "${1}-${2}-${3}${5}").into_owned();
    if GLIBC_VENDOR_SUFFIXES.iter().any(|s| triple.ends_with(s)) {
        triple.push_str("-gnu");
    }
    triple
}

/// A target triple split into components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetTriple(String);

impl TargetTriple {
    pub fn new(triple: impl Into<String>) -> Self {
        Self(triple.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('-')
    }

    pub fn arch(&self) -> &str {
        self.components().next().unwrap_or("")
    }

    pub fn vendor(&self) -> Option<&str> {
        self.components().nth(1)
    }

    pub fn is_apple(&self) -> bool {
        self.0.contains("apple")
    }
}

impl fmt::Display for TargetTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_darwin_minor_versions() {
        assert_eq!(normalize_triple("x86_64-apple-darwin14.0.0"), "x86_64-apple-darwin14");
        assert_eq!(normalize_triple("arm64-apple-macosx13.4.1\n"), "arm64-apple-macosx13");
    }

    #[test]
    fn leaves_four_part_triples_alone() {
        assert_eq!(normalize_triple("x86_64-pc-linux-gnu"), "x86_64-pc-linux-gnu");
        assert_eq!(
            normalize_triple("aarch64-unknown-linux-gnu"),
            "aarch64-unknown-linux-gnu"
        );
    }

    #[test]
    fn appends_gnu_for_redhat_and_suse() {
        assert_eq!(normalize_triple("x86_64-redhat-linux"), "x86_64-redhat-linux-gnu");
        assert_eq!(normalize_triple("x86_64-suse-linux"), "x86_64-suse-linux-gnu");
        assert_eq!(normalize_triple("x86_64-redhat-linux-gnu"), "x86_64-redhat-linux-gnu");
    }

    #[test]
    fn short_inputs_pass_through() {
        assert_eq!(normalize_triple("wasm32"), "wasm32");
    }

    #[test]
    fn triple_components() {
        let t = TargetTriple::new("x86_64-apple-darwin14");
        assert_eq!(t.arch(), "x86_64");
        assert_eq!(t.vendor(), Some("apple"));
        assert!(t.is_apple());
        assert_eq!(t.components().count(), 3);
    }
}
