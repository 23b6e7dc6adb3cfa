//! Feature macros from the build-configuration header (`__config_site`).

use std::path::{Path, PathBuf};

use cxxconf_core::{FlagClass, MacroMap, ResolveError, Result};

use crate::state::ResolutionState;

const HEADER_GUARD: &str = "_LIBCUDACXX_CONFIG_SITE";
const MACRO_PREFIX: &str = "_LIBCUDACXX_";

/// The feature a configuration macro implies, if any.
///
/// `_LIBCUDACXX_HAS_NO_THREADS` becomes `libcpp-has-no-threads`; the
/// ABI version and vcruntime macros have dedicated spellings.
pub fn feature_for_macro(name: &str, value: &str) -> Option<String> {
    match name {
        "_LIBCUDACXX_DISABLE_VISIBILITY_ANNOTATIONS" | "_LIBCUDACXX_HIDE_FROM_ABI_PER_TU_BY_DEFAULT" => None,
        "_LIBCUDACXX_ABI_VERSION" => Some(format!("libcpp-abi-version-v{value}")),
        "_LIBCUDACXX_NO_VCRUNTIME" => Some("libcpp-no-vcruntime".into()),
        _ => name
            .strip_prefix(MACRO_PREFIX)
            .map(|rest| format!("libcpp-{}", rest.to_lowercase().replace('_', "-"))),
    }
}

/// `-DNAME` or `-DNAME=VALUE`.
fn define_flag(name: &str, value: &str) -> String {
    if value.is_empty() {
        format!("-D{name}")
    } else {
        format!("-D{name}={value}")
    }
}

/// Macros the header defines beyond the compiler's predefines, without
/// the header guard.
fn header_macros(state: &mut ResolutionState, header: &Path) -> Result<MacroMap> {
    let baseline = state.flags.baseline();
    let predefines = state.cxx.dump_macros(&baseline, &[])?;
    let with_header = state.cxx.dump_macros(&baseline, &[header.to_path_buf()])?;
    let mut defined = with_header.difference(&predefines);
    if defined.remove(HEADER_GUARD).is_none() {
        return Err(ResolveError::ConfigHeader {
            path: header.to_path_buf(),
            detail: format!("header guard {HEADER_GUARD} is not defined"),
        });
    }
    if defined.is_empty() {
        return Err(ResolveError::ConfigHeader {
            path: header.to_path_buf(),
            detail: "defines no configuration macros".into(),
        });
    }
    Ok(defined)
}

/// Turn the header's macros into features and module-mode defines.
pub fn parse_config_site(state: &mut ResolutionState, header: &Path) -> Result<MacroMap> {
    // MSVC cannot dump macros.
    if state.has_feature("msvc") {
        return Ok(MacroMap::new());
    }
    let defined = header_macros(state, header)?;

    // Module builds cannot see the forced include, so the definitions
    // are lifted onto the command line.
    for (name, value) in defined.iter() {
        state.flags.push(FlagClass::Modules, define_flag(name, value));
    }
    state.add_if_supported(FlagClass::Compile, &["-Wno-macro-redefined"]);

    for (name, value) in defined.iter() {
        if !name.starts_with(MACRO_PREFIX) {
            state.warn(format!("ignoring unexpected macro {name} in {}", header.display()));
            continue;
        }
        if let Some(feature) = feature_for_macro(name, value) {
            state.features.add(feature);
        }
    }
    Ok(defined)
}

/// Use `<obj_root>/__config_site` when the build produced one.
pub fn configure_config_site(state: &mut ResolutionState) -> Result<()> {
    let Some(header) = config_site_header(state) else {
        return Ok(());
    };
    let defined = parse_config_site(state, &header)?;
    let listing: Vec<String> = defined.iter().map(|(k, v)| format!("{k}={v}")).collect();
    state.note(format!(
        "Using __config_site header {} with macros: {{{}}}",
        header.display(),
        listing.join(", ")
    ));
    // After parsing: the probes above must not see the header twice.
    state.flags.push(FlagClass::Compile, "-include");
    state.flags.push(FlagClass::Compile, header.display().to_string());
    state.config_site = defined;
    Ok(())
}

/// Path of the header, if present.
pub fn config_site_header(state: &ResolutionState) -> Option<PathBuf> {
    state
        .roots
        .obj_root
        .as_ref()
        .map(|root| root.join("__config_site"))
        .filter(|h| h.is_file())
}
