//! How compiled test binaries will be run.

use std::fmt;

use cxxconf_core::{Parameters, ResolveError, Result};
use serde::Serialize;

/// The closed set of executors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Executor {
    /// Run on the host.
    Local,
    /// Compile only; nothing is run.
    Noop,
    /// Copy to and run on a remote host over ssh.
    Ssh { host: String, user: Option<String> },
    /// Run `inner` under valgrind.
    Valgrind { args: Vec<String>, inner: Box<Executor> },
}

impl Executor {
    /// Select the executor from `executor`, `executor_host`,
    /// `executor_user`, `use_valgrind` and `valgrind_args`.
    ///
    /// There is no way to tell where in an explicit chain valgrind should
    /// go, so an explicit executor combined with valgrind is rejected.
    pub fn from_params(params: &mut Parameters) -> Result<Self> {
        let explicit = params.get_non_empty("executor").map(str::to_string);
        let use_valgrind = params.get_bool("use_valgrind", false)?;
        let Some(kind) = explicit else {
            if !use_valgrind {
                return Ok(Executor::Local);
            }
            let raw = params.get_or("valgrind_args", "").to_string();
            let args = shlex::split(&raw).ok_or_else(|| ResolveError::unsupported("valgrind_args", &raw))?;
            return Ok(Executor::Valgrind {
                args,
                inner: Box::new(Executor::Local),
            });
        };
        if use_valgrind {
            return Err(ResolveError::Conflict {
                detail: format!("cannot combine executor={kind} with use_valgrind"),
            });
        }
        match kind.as_str() {
            "local" => Ok(Executor::Local),
            "noop" => Ok(Executor::Noop),
            "ssh" => {
                let host = params
                    .get_non_empty("executor_host")
                    .ok_or_else(|| ResolveError::MissingParameter {
                        param: "executor_host".into(),
                        hint: "required by executor=ssh".into(),
                    })?
                    .to_string();
                let user = params.get_non_empty("executor_user").map(str::to_string);
                Ok(Executor::Ssh { host, user })
            }
            other => Err(ResolveError::unsupported("executor", other)),
        }
    }

    /// Whether test binaries are never run.
    pub fn is_noop(&self) -> bool {
        matches!(self, Executor::Noop)
    }
}

impl fmt::Display for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Executor::Local => write!(f, "local"),
            Executor::Noop => write!(f, "noop"),
            Executor::Ssh { host, user: Some(user) } => write!(f, "ssh {user}@{host}"),
            Executor::Ssh { host, user: None } => write!(f, "ssh {host}"),
            Executor::Valgrind { args, inner } => {
                write!(f, "valgrind")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                write!(f, " ({inner})")
            }
        }
    }
}
