//! Live compiler probing.
//!
//! - **Driver:** the compiler-invocation contract ([`CompilerDriver`]) and
//!   how drivers are located ([`Toolchain`])
//! - **CxxCompiler / SystemToolchain:** the process-backed implementation
//! - **ScriptedDriver / ScriptedToolchain:** deterministic stand-ins for tests
//! - **CompilerProbe:** cached capability queries against one compiler

pub mod cache;
pub mod cxx;
pub mod driver;
pub mod probe;
pub mod scripted;

pub use cache::{probe_key, CacheStats, ProbeAnswer, ProbeCache, ProbeKind};
pub use cxx::{CxxCompiler, DriverStyle, SystemToolchain};
pub use driver::{CompilerDriver, Toolchain};
pub use probe::CompilerProbe;
pub use scripted::{ScriptedCounters, ScriptedDriver, ScriptedToolchain};
