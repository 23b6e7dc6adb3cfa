//! Core data model for resolving a standard-library test-suite configuration.
//!
//! The resolution pipeline threads these types through its stages:
//! - **Parameters:** layered lookup of user parameters (environment > CLI > site file > default)
//! - **FeatureSet:** the monotonic set of feature tokens used for test selection
//! - **FlagAccumulator:** ordered compiler flag lists split by class
//! - **CompilerIdentity:** vendor, version and dialect facts discovered by probing
//! - **MacroMap:** predefined-macro dumps used for feature-test detection

pub mod diagnostic;
pub mod error;
pub mod feature;
pub mod flags;
pub mod identity;
pub mod macros;
pub mod params;

pub use diagnostic::{Diagnostic, DiagnosticLevel, Diagnostics};
pub use error::{ErrorKind, ProcessFailure, ResolveError, Result};
pub use feature::FeatureSet;
pub use flags::{render_flags, FlagAccumulator, FlagClass, FlagSupport};
pub use identity::{CompilerIdentity, CompilerVendor, Dialect};
pub use macros::MacroMap;
pub use params::{parse_bool, Parameters};
