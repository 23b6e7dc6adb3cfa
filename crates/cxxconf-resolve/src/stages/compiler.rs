//! Compiler identification.

use std::path::{Path, PathBuf};

use cxxconf_core::{Parameters, ResolveError, Result};
use cxxconf_probe::{CompilerProbe, Toolchain};

use crate::state::{EnvTarget, ResolutionState};

/// Where the compiler under test was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedCompiler {
    pub path: PathBuf,
    pub first_arg: Option<String>,
    /// `clang-cl.exe` was requested and replaced by its `clang++`.
    pub is_clang_cl: bool,
    /// The path was inferred rather than given.
    pub inferred: bool,
}

fn is_clang_cl(path: &str) -> bool {
    Path::new(path).file_name().and_then(|n| n.to_str()) == Some("clang-cl.exe")
}

/// Resolve `cxx_under_test`, inferring `clang++` from the search path
/// when it is absent (or names `clang-cl.exe`).
pub fn locate(params: &Parameters, toolchain: &dyn Toolchain) -> Result<LocatedCompiler> {
    let requested = params.get_non_empty("cxx_under_test").map(str::to_string);
    let first_arg = params.get_non_empty("cxx_first_arg").map(str::to_string);
    let clang_cl = requested.as_deref().is_some_and(is_clang_cl);

    if requested.is_none() || clang_cl {
        // clang-cl's sibling clang++ lives next to it.
        let search_path = match requested.as_deref().map(Path::new) {
            Some(p) if p.is_absolute() => p.parent().map(|d| d.display().to_string()),
            _ => params.env("PATH").map(str::to_string),
        };
        if let Some(path) = toolchain.find_executable("clang++", search_path.as_deref()) {
            return Ok(LocatedCompiler {
                path,
                first_arg,
                is_clang_cl: clang_cl,
                inferred: true,
            });
        }
        if clang_cl {
            return Err(ResolveError::CompilerNotFound {
                detail: "failed to find clang++ substitution for clang-cl".into(),
            });
        }
    }

    let Some(requested) = requested else {
        return Err(ResolveError::MissingParameter {
            param: "cxx_under_test".into(),
            hint: "e.g., --param=cxx_under_test=clang++".into(),
        });
    };
    let path = toolchain
        .find_executable(&requested, params.env("PATH"))
        .ok_or_else(|| ResolveError::CompilerNotFound {
            detail: format!("cxx_under_test '{requested}' is not an executable on the search path"),
        })?;
    Ok(LocatedCompiler {
        path,
        first_arg,
        is_clang_cl: false,
        inferred: false,
    })
}

fn split_env_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Record the compiler identity, wire up clang-cl's environment and, for
/// nvcc, identify the host compiler.
pub fn configure(state: &mut ResolutionState, located: &LocatedCompiler) -> Result<()> {
    if located.inferred {
        state.note(format!("inferred cxx_under_test as: {}", located.path.display()));
    }
    if located.is_clang_cl {
        configure_clang_cl(state);
    }

    let identity = state.cxx.identity().clone();
    state.features.add_all(identity.feature_tokens(3));
    let vendor = identity.vendor.map(|v| v.to_string()).unwrap_or_else(|| "unknown".into());
    let version = identity.version.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "unknown".into());
    let dialect = identity.default_dialect.as_ref().map(|d| d.to_string()).unwrap_or_else(|| "none".into());
    state.note(format!("detected cxx.type as: {vendor}"));
    state.note(format!("detected cxx.version as: {version}"));
    state.note(format!("detected cxx.default_dialect as: {dialect}"));
    state.note(format!("detected cxx.is_nvrtc as: {}", identity.is_nvrtc));

    // Keeps ccache from stripping the comments `-verify` tests rely on.
    state.compile_env.insert("CCACHE_CPP2".into(), "1".into());

    if state.is_nvcc() && !identity.is_nvrtc {
        configure_host_compiler(state)?;
    }
    if state.has_feature("icc") {
        state.flags.link.push("-lirc".into());
    }
    state.push_compile_env();
    Ok(())
}

fn configure_clang_cl(state: &mut ResolutionState) {
    let includes = split_env_list(state.params.env("INCLUDE"));
    let libs = split_env_list(state.params.env("LIB"));
    for dir in includes {
        state.flags.compile.extend(["-isystem".to_string(), dir]);
    }
    for dir in libs {
        state.add_path(EnvTarget::Exec, Path::new(&dir));
        state.flags.link.extend(["-L".to_string(), dir]);
    }
}

fn default_host_compiler(state: &ResolutionState) -> &'static str {
    if state.host.is_darwin() {
        "clang"
    } else if state.host.is_windows() {
        "cl.exe"
    } else {
        "gcc"
    }
}

fn configure_host_compiler(state: &mut ResolutionState) -> Result<()> {
    let name = match state.params.get_non_empty("nvcc_host_compiler") {
        Some(name) => name.trim().to_string(),
        None => default_host_compiler(state).to_string(),
    };
    let path = state
        .toolchain
        .find_executable(&name, state.params.env("PATH"))
        .ok_or_else(|| ResolveError::CompilerNotFound {
            detail: format!("nvcc host compiler '{name}' is not an executable on the search path"),
        })?;
    let host = CompilerProbe::identify(state.toolchain.open(&path, None))?;
    let identity = host.identity().clone();
    state.features.add_all(identity.feature_tokens(2));
    let describe = |v: Option<String>| v.unwrap_or_else(|| "unknown".into());
    state.note(format!(
        "detected host_cxx.type as: {}",
        describe(identity.vendor.map(|v| v.to_string()))
    ));
    state.note(format!(
        "detected host_cxx.version as: {}",
        describe(identity.version.as_ref().map(|v| v.to_string()))
    ));
    state.note(format!(
        "detected host_cxx.default_dialect as: {}",
        describe(identity.default_dialect.as_ref().map(|d| d.to_string()))
    ));
    state.host_cxx = Some(host);
    Ok(())
}
