//! The compiler-invocation collaborator.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use cxxconf_core::{MacroMap, ProcessFailure};

/// Runs one compiler binary.
///
/// Implementations answer with raw facts only; caching and error
/// classification live in [`crate::CompilerProbe`].
pub trait CompilerDriver: fmt::Debug {
    /// The compiler executable.
    fn path(&self) -> &Path;

    /// Argument placed before every other argument.
    fn first_arg(&self) -> Option<&str>;

    /// Compile an empty translation unit with `args`; true on success.
    fn try_compile(&mut self, args: &[String]) -> bool;

    /// Preprocess an empty translation unit in macro-dump mode.
    ///
    /// `includes` are force-included before the (empty) source.
    fn dump_macros(&mut self, args: &[String], includes: &[PathBuf]) -> Result<MacroMap, ProcessFailure>;

    /// Ask the compiler for the triple it targets under `args`.
    fn target_triple(&mut self, args: &[String]) -> Result<String, ProcessFailure>;

    /// Replace the environment every invocation runs with.
    fn set_env(&mut self, _env: &BTreeMap<String, String>) {}
}

/// Locates compilers and opens drivers for them.
pub trait Toolchain: fmt::Debug {
    /// Search `search_path` (or the process `PATH`) for an executable.
    fn find_executable(&self, name: &str, search_path: Option<&str>) -> Option<PathBuf>;

    /// Open a driver for the compiler at `path`.
    fn open(&self, path: &Path, first_arg: Option<&str>) -> Box<dyn CompilerDriver>;
}
