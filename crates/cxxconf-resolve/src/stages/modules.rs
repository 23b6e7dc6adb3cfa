//! Clang modules and the coroutines TS.

use std::fs;

use cxxconf_core::{FlagClass, ResolveError, Result};

use crate::state::ResolutionState;

fn module_flags(state: &ResolutionState) -> Vec<String> {
    let mut flags = vec!["-fmodules".to_string()];
    if !state.host.is_darwin() {
        flags.extend(["-Xclang", "-fmodules-local-submodule-visibility"].map(String::from));
    }
    flags
}

/// Probe module support, reset the module cache and, when requested,
/// build every test as a module.
pub fn configure_modules(state: &mut ResolutionState) -> Result<()> {
    let flags = module_flags(state);
    let borrowed: Vec<&str> = flags.iter().map(String::as_str).collect();
    let supported = state.supports(&borrowed);
    let enabled = state
        .params
        .get_bool_env("enable_modules", false, "LIBCXX_ENABLE_MODULES")?;
    state.sync_diagnostics();
    if enabled && !supported {
        return Err(ResolveError::ToolchainUnusable {
            detail: "-fmodules is enabled but not supported by the compiler".into(),
        });
    }
    if !supported {
        return Ok(());
    }
    state.features.add("modules-support");

    let cache = state.roots.exec_root.join("modules.cache");
    let io = |source| ResolveError::Io {
        path: cache.clone(),
        source,
    };
    if cache.is_dir() {
        fs::remove_dir_all(&cache).map_err(io)?;
    }
    fs::create_dir_all(&cache).map_err(io)?;
    let cache = fs::canonicalize(&cache).map_err(io)?;

    state.flags.extend(FlagClass::Modules, flags);
    state
        .flags
        .push(FlagClass::Modules, format!("-fmodules-cache-path={}", cache.display()));
    if enabled {
        state.features.add("-fmodules");
        state.flags.enable_modules();
    }
    Ok(())
}

/// `fcoroutines-ts` when the TS flag is accepted and advertises a recent
/// `__cpp_coroutines`.
pub fn configure_coroutines(state: &mut ResolutionState) -> Result<()> {
    if !state.supports(&["-fcoroutines-ts"]) {
        return Ok(());
    }
    let mut args = state.flags.baseline();
    args.push("-fcoroutines-ts".into());
    let macros = state.cxx.dump_macros(&args, &[])?;
    match macros.int_value("__cpp_coroutines") {
        Some(version) if version >= 201703 => state.features.add("fcoroutines-ts"),
        Some(_) => {}
        None => state.warn("-fcoroutines-ts is supported but __cpp_coroutines is not defined"),
    }
    Ok(())
}
