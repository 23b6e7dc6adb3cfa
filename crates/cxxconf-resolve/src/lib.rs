//! Resolution of a standard-library test-suite configuration.
//!
//! Takes sparse user parameters plus live compiler probes and produces the
//! flags, features, environment and substitutions the test runner needs.
//! Stages run strictly in order: executor and target info, compiler
//! identification, triple and deployment, roots and standard library,
//! capabilities, dialect, compile and link flags, per-axis flags,
//! features, and finally the substitution table.

pub mod executor;
pub mod pipeline;
pub mod resolved;
pub mod stages;
pub mod state;
pub mod substitutions;

pub use executor::Executor;
pub use pipeline::{resolve, Resolver};
pub use resolved::ResolvedConfig;
pub use stages::link::CxxAbi;
pub use stages::sanitizer::Sanitizer;
pub use state::{EnvTarget, ResolutionState, Roots, StdLib, SystemCxxLib};
pub use substitutions::SubstitutionTable;
