//! Error taxonomy for configuration resolution.

use std::path::PathBuf;

/// Broad category of a fatal resolution error.
///
/// Capability gaps are never errors; they only gate flags and features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The invocation itself is invalid (bad parameter, missing directory).
    Configuration,
    /// The toolchain is broken or absent.
    Toolchain,
}

/// A process invocation that exited unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessFailure {
    /// The full command line that was run.
    pub command: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    /// Exit code, or `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
}

impl ProcessFailure {
    /// Render a multi-line report of the failed invocation.
    pub fn report(&self) -> String {
        let mut report = format!("Command: {}\n", self.command.join(" "));
        match self.exit_code {
            Some(code) => report.push_str(&format!("Exit Code: {code}\n")),
            None => report.push_str("Exit Code: (terminated by signal)\n"),
        }
        if !self.stdout.is_empty() {
            report.push_str(&format!("Standard Output:\n--\n{}--\n", self.stdout));
        }
        if !self.stderr.is_empty() {
            report.push_str(&format!("Standard Error:\n--\n{}--\n", self.stderr));
        }
        report
    }
}

/// Fatal errors that abort a configuration run.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A boolean parameter held a value outside the recognized vocabulary.
    #[error("parameter '{param}' should be true or false (got '{value}')")]
    InvalidBool { param: String, value: String },

    /// A closed-set parameter held an unrecognized value.
    #[error("unsupported value for \"{param}\": {value}")]
    UnsupportedValue { param: String, value: String },

    /// A parameter that has no default was not supplied.
    #[error("must specify parameter {param} ({hint})")]
    MissingParameter { param: String, hint: String },

    /// A path named by a parameter (or derived from one) does not exist.
    #[error("{param}='{}' is not a {expected}", path.display())]
    MissingPath {
        param: String,
        path: PathBuf,
        /// "directory" or "file".
        expected: &'static str,
    },

    /// Two parameters that cannot be combined were both given.
    #[error("conflicting configuration: {detail}")]
    Conflict { detail: String },

    /// The build-configuration header is malformed.
    #[error("invalid configuration header {}: {detail}", path.display())]
    ConfigHeader { path: PathBuf, detail: String },

    /// No usable compiler could be located.
    #[error("compiler not found: {detail}")]
    CompilerNotFound { detail: String },

    /// A toolchain invocation that must succeed did not.
    #[error("{context}\n{}", failure.report())]
    Toolchain {
        context: String,
        failure: ProcessFailure,
    },

    /// The compiler could not be spawned or reported nothing usable.
    #[error("toolchain error: {detail}")]
    ToolchainUnusable { detail: String },

    /// I/O error while preparing scratch directories.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ResolveError {
    /// Classify the error for exit-code mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::InvalidBool { .. }
            | ResolveError::UnsupportedValue { .. }
            | ResolveError::MissingParameter { .. }
            | ResolveError::MissingPath { .. }
            | ResolveError::Conflict { .. }
            | ResolveError::ConfigHeader { .. }
            | ResolveError::Io { .. } => ErrorKind::Configuration,
            ResolveError::CompilerNotFound { .. }
            | ResolveError::Toolchain { .. }
            | ResolveError::ToolchainUnusable { .. } => ErrorKind::Toolchain,
        }
    }

    /// Shorthand for [`ResolveError::UnsupportedValue`].
    pub fn unsupported(param: impl Into<String>, value: impl Into<String>) -> Self {
        ResolveError::UnsupportedValue {
            param: param.into(),
            value: value.into(),
        }
    }
}

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, ResolveError>;
