//! Content-addressed in-memory probe cache.
//!
//! Lives exactly as long as one [`crate::CompilerProbe`]; keys include the
//! compiler fingerprint, so answers never cross compiler identities.

use std::collections::HashMap;
use std::path::PathBuf;

use cxxconf_core::{MacroMap, ProcessFailure};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Statistics about cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

/// What a cached probe asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    Compile,
    Macros,
}

/// A cached probe answer.
#[derive(Debug, Clone)]
pub enum ProbeAnswer {
    Compiled(bool),
    Macros(Result<MacroMap, ProcessFailure>),
}

#[derive(Debug, Clone, Default)]
pub struct ProbeCache {
    entries: HashMap<String, ProbeAnswer>,
    hits: usize,
    misses: usize,
}

impl ProbeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a previous answer by key.
    pub fn lookup(&mut self, key: &str) -> Option<&ProbeAnswer> {
        match self.entries.get(key) {
            Some(answer) => {
                self.hits += 1;
                tracing::trace!(key, "probe cache hit");
                Some(answer)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn store(&mut self, key: String, answer: ProbeAnswer) {
        self.entries.insert(key, answer);
    }

    pub fn statistics(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}

/// SHA-256 of (compiler fingerprint, kind, arguments, includes).
///
/// Arguments are length-prefixed so that `["-a b"]` and `["-a", "b"]`
/// never collide.
pub fn probe_key(fingerprint: &str, kind: ProbeKind, args: &[String], includes: &[PathBuf]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fingerprint.as_bytes());
    hasher.update(format!("{kind:?}").as_bytes());
    for arg in args {
        hasher.update((arg.len() as u64).to_le_bytes());
        hasher.update(arg.as_bytes());
    }
    hasher.update(b"|includes|");
    for include in includes {
        let text = include.display().to_string();
        hasher.update((text.len() as u64).to_le_bytes());
        hasher.update(text.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
