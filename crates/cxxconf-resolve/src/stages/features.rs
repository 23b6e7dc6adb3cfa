//! Features that depend on the whole resolved configuration.

use cxxconf_core::Result;

use crate::state::{ResolutionState, StdLib};

/// `<feature>`, `<feature>=<triple>` and `<feature>=<component>` for
/// each triple component, plus the deployment forms when one is in use.
fn add_system_library_features(state: &mut ResolutionState) {
    const FEATURE: &str = "with_system_cxx_lib";
    state.features.add(FEATURE);
    if let Some(triple) = state.target_triple.clone() {
        state.features.add(format!("{FEATURE}={triple}"));
        for component in triple.components() {
            state.features.add(format!("{FEATURE}={component}"));
        }
    }
    if let Some(deployment) = state.deployment.as_ref().filter(|_| state.use_deployment) {
        let forms = deployment.feature_forms(FEATURE);
        state.features.add_all(forms);
    }
}

/// Language features the compiler lacks in the selected dialect.
fn add_language_gaps(state: &mut ResolutionState) -> Result<()> {
    let baseline = state.flags.baseline();
    let macros = state.cxx.dump_macros(&baseline, &[])?;
    if !macros.contains("__cpp_if_constexpr") {
        state.features.add("libcpp-no-if-constexpr");
    }
    if !macros.contains("__cpp_structured_bindings") {
        state.features.add("libcpp-no-structured-bindings");
    }
    if macros.int_value("__cpp_deduction_guides").map_or(true, |v| v < 201611) {
        state.features.add("libcpp-no-deduction-guides");
    }
    Ok(())
}

fn add_glibc_version(state: &mut ResolutionState) {
    let mut args = state.flags.baseline();
    args.extend(["-include".to_string(), "features.h".to_string()]);
    let Some(macros) = state.cxx.try_dump_macros(&args, &[]) else {
        return;
    };
    if let (Some(major), Some(minor)) = (macros.get("__GLIBC__"), macros.get("__GLIBC_MINOR__")) {
        let tokens = [
            "glibc".to_string(),
            format!("glibc-{major}"),
            format!("glibc-{major}.{minor}"),
        ];
        state.features.add_all(tokens);
    }
}

pub fn configure_features(state: &mut ResolutionState) -> Result<()> {
    if let Some(extra) = state.params.get_non_empty("additional_features").map(str::to_string) {
        state.features.add_all(
            extra
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string),
        );
    }
    state.target_info.add_locale_features(&mut state.features);

    if state.system_cxx_lib.is_system() {
        add_system_library_features(state);
    }
    // Only libc++ carries availability markup.
    if state.use_deployment && state.stdlib == StdLib::LibCxx {
        state.features.add("availability");
        if let Some(deployment) = &state.deployment {
            state.features.add_all(deployment.feature_forms("availability"));
        }
    }
    if state.host.is_darwin() {
        state.features.add("apple-darwin");
    }
    let platform = state.target_info.platform().to_string();
    state.features.add(platform);

    // Simulator runs can take very long, so tests may require this.
    let long_tests = match state.params.get_bool_opt("long_tests", None, None)? {
        Some(explicit) => explicit,
        None => {
            state.note("inferred long_tests as: true");
            true
        }
    };
    if long_tests {
        state.features.add("long_tests");
    }

    if !state.params.get_bool("enable_filesystem", true)? {
        state
            .features
            .add_all(["c++filesystem-disabled", "dylib-has-no-filesystem"]);
    }

    if state.supports(&["-fsized-deallocation"]) {
        state.features.add("-fsized-deallocation");
    }
    if state.supports(&["-faligned-allocation"]) {
        state.features.add("-faligned-allocation");
    } else {
        state.features.add("no-aligned-allocation");
    }
    if state.supports(&["-fdelayed-template-parsing"]) {
        state.features.add("fdelayed-template-parsing");
    }
    if state.params.get_bool("has_libatomic", false)? {
        state.features.add("libatomic");
    }

    // MSVC cannot dump macros.
    if !state.has_feature("msvc") {
        add_language_gaps(state)?;
    }

    if state.is_windows() {
        state.features.add("windows");
        if state.stdlib == StdLib::LibCxx {
            // Known Windows failures, tracked until they are diagnosed.
            state.features.add("LIBCXX-WINDOWS-FIXME");
        }
    }

    if !state.has_feature("msvc") {
        add_glibc_version(state);
    }

    if state
        .params
        .get_non_empty("libcxx_gdb")
        .is_some_and(|gdb| !gdb.contains("NOTFOUND"))
    {
        state.features.add("libcxx_gdb");
    }

    if state.target_info.platform() == "darwin"
        && state.target_info.is_host_macosx()
        && state.supports(&["-x", "objective-c++", "-fobjc-arc"])
    {
        state.features.add("objective-c++");
    }
    Ok(())
}
