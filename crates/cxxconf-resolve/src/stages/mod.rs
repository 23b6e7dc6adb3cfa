//! The resolution stages, in the only order they may run.
//!
//! Each stage reads what earlier stages resolved and writes its own
//! fragment of [`crate::ResolutionState`].

pub mod capabilities;
pub mod compile;
pub mod compiler;
pub mod config_site;
pub mod diagnostics;
pub mod dialect;
pub mod features;
pub mod filesystem;
pub mod link;
pub mod modules;
pub mod paths;
pub mod sanitizer;
pub mod target;
pub mod warnings;
