//! Compile flags: support headers, language switches and per-target extras.

use std::path::PathBuf;

use cxxconf_core::{FlagClass, ResolveError, Result};

use super::config_site::configure_config_site;
use crate::state::{ResolutionState, StdLib};

/// Tell nvcc which host compiler to drive. Must precede dialect probing.
pub fn configure_ccbin(state: &mut ResolutionState) {
    if !state.is_nvcc() {
        return;
    }
    if let Some(host) = state.params.get_non_empty("nvcc_host_compiler").map(str::to_string) {
        state.flags.push(FlagClass::Compile, format!("-ccbin={host}"));
    }
}

fn include_support_header(state: &mut ResolutionState, name: &str) {
    let header = state.roots.support_dir().join(name);
    state.flags.push(FlagClass::Compile, "-include");
    state.flags.push(FlagClass::Compile, header.display().to_string());
}

/// Forced includes and the header search path of the library under test.
pub fn configure_header_includes(state: &mut ResolutionState) -> Result<()> {
    configure_config_site(state)?;
    if state.stdlib != StdLib::LibStdCxx && !state.is_windows() {
        include_support_header(state, "nasty_macros.h");
    }
    if state.stdlib == StdLib::Msvc {
        include_support_header(state, "msvc_stdlib_force_include.h");
    }
    if state.is_windows() && state.debug_build && state.stdlib != StdLib::Msvc {
        include_support_header(state, "set_windows_crt_report_mode.h");
    }

    let cxx_headers = state.params.get("cxx_headers").map(str::to_string);
    let use_system = match cxx_headers.as_deref() {
        Some("") => true,
        None => state.stdlib != StdLib::LibCxx,
        Some(_) => false,
    };
    if use_system {
        state.note("using the system cxx headers");
        return Ok(());
    }
    if !state.has_feature("nvcc") && !state.has_feature("nvhpc") {
        state.flags.push(FlagClass::Compile, "-nostdinc++");
    }
    let headers = cxx_headers
        .map(PathBuf::from)
        .unwrap_or_else(|| state.roots.src_root.join("include"));
    if !headers.is_dir() {
        return Err(ResolveError::MissingPath {
            param: "cxx_headers".into(),
            path: headers,
            expected: "directory",
        });
    }
    state.flags.push(FlagClass::Compile, format!("-I{}", headers.display()));
    if let Some(obj_root) = &state.roots.obj_root {
        let build_headers = obj_root.join("include").join("c++build");
        if build_headers.is_dir() {
            state.flags.push(FlagClass::Compile, format!("-I{}", build_headers.display()));
        }
    }
    Ok(())
}

/// `enable_exceptions=false`.
pub fn configure_exceptions(state: &mut ResolutionState) -> Result<()> {
    if state.params.get_bool("enable_exceptions", true)? {
        return Ok(());
    }
    state.features.add("libcpp-no-exceptions");
    // NVHPC treats every expression as noexcept in its no-exceptions mode,
    // and MSVC has no switch for it.
    if !state.has_feature("nvhpc") && !state.has_feature("msvc") {
        state.push_host_flag(FlagClass::Compile, "-fno-exceptions");
    }
    Ok(())
}

/// `enable_rtti=false`.
pub fn configure_rtti(state: &mut ResolutionState) -> Result<()> {
    if state.params.get_bool("enable_rtti", true)? {
        return Ok(());
    }
    state.features.add("libcpp-no-rtti");
    let flag = if state.has_feature("nvhpc") {
        "--no_rtti"
    } else if state.has_feature("msvc") {
        "/GR-"
    } else {
        "-fno-rtti"
    };
    state.push_host_flag(FlagClass::Compile, flag);
    state.flags.push(FlagClass::Compile, "-D_LIBCUDACXX_NO_RTTI");
    Ok(())
}

/// Non-default ABI version and the unstable ABI.
pub fn configure_abi_version(state: &mut ResolutionState) -> Result<()> {
    let version = state.params.get_or("abi_version", "").trim().to_string();
    if !version.is_empty() && version != "1" {
        state.flags.push(FlagClass::Compile, format!("-D_LIBCUDACXX_ABI_VERSION={version}"));
    }
    if state.params.get_bool("abi_unstable", false)? {
        state.features.add("libcpp-abi-unstable");
        state.flags.push(FlagClass::Compile, "-D_LIBCUDACXX_ABI_UNSTABLE");
    }
    Ok(())
}

/// Everything up to the user-supplied extras, after the dialect is fixed.
pub fn configure_default_flags(state: &mut ResolutionState) -> Result<()> {
    configure_header_includes(state)?;
    state
        .target_info
        .add_cxx_compile_flags(state.deployment.as_ref(), &mut state.flags.compile);
    configure_exceptions(state)?;
    configure_rtti(state)?;
    configure_abi_version(state)?;

    if state.params.get_bool("enable_32bit", false)? {
        state.flags.push(FlagClass::General, "-m32");
    }
    // Verbose driver output makes failing tests easier to diagnose.
    state.flags.push(FlagClass::General, "-v");
    if let Some(sysroot) = state.params.get_non_empty("sysroot").map(str::to_string) {
        state.flags.push(FlagClass::General, format!("--sysroot={sysroot}"));
    }
    if let Some(toolchain) = state.params.get_non_empty("gcc_toolchain").map(str::to_string) {
        state.flags.push(FlagClass::General, format!("--gcc-toolchain={toolchain}"));
    }
    // The forced CRT-report include needs _DEBUG, and it must come before
    // the --target probe below or that probe fails.
    if state.is_windows() && state.debug_build {
        state.flags.push(FlagClass::Compile, "-D_DEBUG");
    }
    if state.use_target {
        if let Some(triple) = state.target_triple.as_ref().map(|t| t.to_string()) {
            let flag = format!("--target={triple}");
            if !state.add_if_supported(FlagClass::General, &[flag.as_str()]) {
                state.warn("use_target is true but --target is not supported by the compiler");
            }
        }
    }
    if let Some(deployment) = state.deployment.as_ref().filter(|_| state.use_deployment) {
        let flags = deployment.flags();
        state.flags.extend(FlagClass::General, flags);
    }

    let support = state.roots.support_dir();
    state.flags.push(FlagClass::Compile, format!("-I{}", support.display()));

    let pstl_src = state.params.get("pstl_src_root").map(PathBuf::from);
    let pstl_obj = state.params.get("pstl_obj_root").map(PathBuf::from);
    if let (Some(src), Some(obj)) = (pstl_src, pstl_obj) {
        for dir in [src.join("include"), obj.join("generated_headers"), src.join("test")] {
            state.flags.push(FlagClass::Compile, format!("-I{}", dir.display()));
        }
        state.features.add("parallel-algorithms");
    }

    // Older clangs need a deeper template instantiation limit for variant.
    state.add_if_supported(FlagClass::General, &["-ftemplate-depth=270"]);
    Ok(())
}

/// Parse `compute_archs` into sorted SM numbers.
pub fn parse_compute_archs(raw: &str) -> Result<Vec<u32>> {
    let words = shlex::split(raw).ok_or_else(|| ResolveError::unsupported("compute_archs", raw))?;
    let mut archs = words
        .iter()
        .map(|w| w.parse::<u32>().map_err(|_| ResolveError::unsupported("compute_archs", w.as_str())))
        .collect::<Result<Vec<_>>>()?;
    archs.sort_unstable();
    Ok(archs)
}

/// Device code generation targets, with a `pre-sm-N` feature for every
/// threshold some requested architecture falls below.
fn configure_compute_archs(state: &mut ResolutionState) -> Result<()> {
    let Some(raw) = state.params.get_non_empty("compute_archs").map(str::to_string) else {
        return Ok(());
    };
    let archs = parse_compute_archs(&raw)?;
    for arch in &archs {
        state
            .flags
            .push(FlagClass::Compile, format!("-gencode=arch=compute_{arch},code=sm_{arch}"));
    }
    if state.params.get_bool("enable_compute_future", false)? {
        if let Some(newest) = archs.last() {
            state
                .flags
                .push(FlagClass::Compile, format!("-gencode=arch=compute_{newest},code=compute_{newest}"));
        }
    }
    for threshold in [32, 60, 70, 90] {
        if archs.iter().any(|&a| a < threshold) {
            state.features.add(format!("pre-sm-{threshold}"));
        }
    }
    Ok(())
}

/// Default flags, then user-supplied and device-specific extras.
pub fn configure_compile_flags(state: &mut ResolutionState) -> Result<()> {
    configure_default_flags(state)?;

    let extra = state.split_param("compile_flags")?;
    state.flags.extend(FlagClass::Compile, extra);
    if state.is_windows() {
        state.flags.push(FlagClass::Compile, "-D_CRT_SECURE_NO_WARNINGS");
        // Keep windows.h from defining min and max.
        state.flags.push(FlagClass::Compile, "-DNOMINMAX");
        if state.has_feature("msvc") {
            state.push_host_flag(FlagClass::Compile, "/bigobj");
        }
    }
    let additional = state.split_param("test_compiler_flags")?;
    state.flags.extend(FlagClass::Compile, additional);

    if state.cxx.identity().is_nvrtc {
        state.features.add("nvrtc");
    }
    if state.is_nvcc() {
        state.flags.push(FlagClass::Compile, "--extended-lambda");
        configure_compute_archs(state)?;
    }
    Ok(())
}
