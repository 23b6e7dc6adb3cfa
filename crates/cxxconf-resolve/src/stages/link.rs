//! Link flags: library search paths, the C++ and ABI libraries, and the
//! platform's system libraries.

use std::path::{Path, PathBuf};

use cxxconf_core::{FlagClass, ResolveError, Result};
use cxxconf_targets::{LinkOptions, RuntimeRoots};

use crate::state::{EnvTarget, ResolutionState, StdLib, SystemCxxLib};

/// The ABI library the tests link against (`cxx_abi`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CxxAbi {
    LibStdCxx,
    LibSupCxx,
    LibCxxAbi,
    LibCxxRt,
    VcRuntime,
    /// `none` or `default`: nothing beyond the C runtime.
    None,
}

impl CxxAbi {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "libstdc++" => Ok(CxxAbi::LibStdCxx),
            "libsupc++" => Ok(CxxAbi::LibSupCxx),
            "libcxxabi" => Ok(CxxAbi::LibCxxAbi),
            "libcxxrt" => Ok(CxxAbi::LibCxxRt),
            "vcruntime" => Ok(CxxAbi::VcRuntime),
            "none" | "default" => Ok(CxxAbi::None),
            other => Err(ResolveError::unsupported("cxx_abi", other)),
        }
    }
}

/// `lib<name>.a`, or `lib<name>.lib` on Windows.
fn static_lib_name(state: &ResolutionState, name: &str) -> String {
    if state.is_windows() {
        format!("lib{name}.lib")
    } else {
        format!("lib{name}.a")
    }
}

fn push_library_dir(state: &mut ResolutionState, dir: &Path) {
    state.flags.push(FlagClass::Link, format!("-L{}", dir.display()));
}

/// Search paths and run-time paths for the C++ library itself.
fn configure_cxx_library_path(state: &mut ResolutionState) -> Result<()> {
    match state.system_cxx_lib.clone() {
        SystemCxxLib::Local => {
            if let Some(root) = state.roots.library_root.clone() {
                push_library_dir(state, &root);
                if state.is_windows() && state.link_shared {
                    state.add_path(EnvTarget::Compile, &root);
                }
            }
            if let Some(root) = state.roots.runtime_root.clone() {
                if !state.is_windows() {
                    state.push_rpath(&root);
                } else if state.link_shared {
                    state.add_path(EnvTarget::Exec, &root);
                }
            }
        }
        SystemCxxLib::Dir(dir) => {
            push_library_dir(state, &dir);
            if !state.is_windows() {
                state.push_rpath(&dir);
            }
            if state.is_windows() && state.link_shared {
                state.add_path(EnvTarget::Compile, &dir);
            }
        }
        SystemCxxLib::Default => {}
    }
    let extra = state.split_param("test_linker_flags")?;
    state.flags.extend(FlagClass::Link, extra);
    Ok(())
}

fn configure_abi_library_path(state: &mut ResolutionState) {
    let Some(root) = state.roots.abi_library_root.clone() else {
        return;
    };
    push_library_dir(state, &root);
    if state.is_windows() {
        state.add_path(EnvTarget::Exec, &root);
    } else {
        state.push_rpath(&root);
    }
}

fn configure_cxx_library(state: &mut ResolutionState) -> Result<()> {
    if state.params.get_bool("enable_experimental", false)? {
        state.features.add("c++experimental");
        state.flags.push(FlagClass::Link, "-lc++experimental");
    }
    if state.link_shared {
        state.flags.push(FlagClass::Link, "-lc++");
    } else if !state.is_nvcc() {
        match state.params.get_non_empty("cxx_library_root").map(PathBuf::from) {
            Some(root) => {
                let archive = root.join(static_lib_name(state, "c++"));
                if !archive.exists() {
                    return Err(ResolveError::MissingPath {
                        param: "cxx_library_root".into(),
                        path: archive,
                        expected: "file",
                    });
                }
                state.flags.push(FlagClass::Link, archive.display().to_string());
            }
            None => state.flags.push(FlagClass::Link, "-lc++"),
        }
    }
    Ok(())
}

fn configure_abi_library(state: &mut ResolutionState) -> Result<()> {
    let abi = CxxAbi::parse(state.params.get_or("cxx_abi", "libcxxabi"))?;
    let debug_suffix = if state.debug_build { "d" } else { "" };
    match abi {
        CxxAbi::LibStdCxx => state.flags.push(FlagClass::Link, "-lstdc++"),
        CxxAbi::LibSupCxx => state.flags.push(FlagClass::Link, "-lsupc++"),
        CxxAbi::LibCxxAbi => {
            // Also linked when testing the ABI library itself; the test
            // configuration is shared between the two.
            let testing_abi = state.params.get("name") == Some("libc++abi");
            if state.target_info.allow_cxxabi_link() || testing_abi {
                let shared = state.params.get_bool("libcxxabi_shared", true)?;
                let flag = match (&state.roots.abi_library_root, shared) {
                    (Some(root), false) => root.join(static_lib_name(state, "c++abi")).display().to_string(),
                    _ => "-lc++abi".to_string(),
                };
                state.flags.push(FlagClass::Link, flag);
            }
        }
        CxxAbi::LibCxxRt => state.flags.push(FlagClass::Link, "-lcxxrt"),
        CxxAbi::VcRuntime => {
            for lib in ["vcruntime", "ucrt", "msvcrt"] {
                state.flags.push(FlagClass::Link, format!("-l{lib}{debug_suffix}"));
            }
        }
        CxxAbi::None => {
            if state.is_windows() {
                state.flags.push(FlagClass::Link, format!("-lmsvcrt{debug_suffix}"));
            }
        }
    }
    Ok(())
}

fn configure_extra_libraries(state: &mut ResolutionState) -> Result<()> {
    if state.params.get_bool("cxx_ext_threads", false)? {
        state.flags.push(FlagClass::Link, "-lc++external_threads");
    }
    let options = LinkOptions {
        enable_threads: state.params.get_bool("enable_threads", true)?,
        llvm_unwinder: state.params.get_bool("llvm_unwinder", false)?,
        link_shared: state.link_shared,
        builtins_library: state.params.get_non_empty("builtins_library").map(str::to_string),
        has_libatomic: state.params.get_bool("has_libatomic", false)?,
        sanitizer: state.params.get_non_empty("use_sanitizer").is_some_and(|s| !s.trim().is_empty()),
    };
    state.target_info.add_cxx_link_flags(&options, &mut state.flags.link);
    Ok(())
}

/// Build the link flags for the library under test.
pub fn configure_link_flags(state: &mut ResolutionState) -> Result<()> {
    if state.is_nvcc() {
        if let Some(host) = state.params.get_non_empty("nvcc_host_compiler").map(str::to_string) {
            state.flags.push(FlagClass::Link, format!("-ccbin={host}"));
        }
    }
    configure_cxx_library_path(state)?;
    configure_abi_library_path(state);

    match state.stdlib {
        StdLib::LibCxx => {
            let suppress_defaults = state.params.get("name") != Some("libcu++")
                && !(state.has_feature("nvhpc") && state.cxx.identity().is_nvrtc);
            if suppress_defaults {
                if !state.has_feature("nvhpc") {
                    state.push_host_flag(FlagClass::Link, "-nodefaultlibs");
                }
                if state.is_windows() && !state.has_feature("msvc") {
                    state.push_host_flag(FlagClass::Link, "-nostdlib");
                }
            }
            configure_cxx_library(state)?;
            configure_abi_library(state)?;
            configure_extra_libraries(state)?;
        }
        StdLib::LibStdCxx => {
            state.features.add("c++experimental");
            state.flags.extend(FlagClass::Link, ["-lstdc++fs", "-lm", "-pthread"]);
        }
        StdLib::Msvc => {}
        StdLib::CxxDefault => state.flags.push(FlagClass::Link, "-pthread"),
    }

    let extra = state.split_param("link_flags")?;
    state.flags.extend(FlagClass::Link, extra);
    state.push_compile_env();
    Ok(())
}

/// Let the platform export the library directories tests load from.
pub fn configure_env(state: &mut ResolutionState) {
    let roots = RuntimeRoots {
        cxx_runtime_root: match state.system_cxx_lib {
            SystemCxxLib::Local => state.roots.runtime_root.clone(),
            _ => None,
        },
        system_cxx_lib: match &state.system_cxx_lib {
            SystemCxxLib::Dir(dir) => Some(dir.clone()),
            _ => None,
        },
        abi_library_root: state.roots.abi_library_root.clone(),
    };
    state.target_info.configure_env(&roots, &mut state.exec_env);
}
