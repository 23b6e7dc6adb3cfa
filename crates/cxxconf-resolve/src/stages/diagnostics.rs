//! Compiler diagnostics presentation and the library's debug mode.

use cxxconf_core::{FlagClass, ResolveError, Result};

use crate::state::ResolutionState;

const COLOR_FLAG: &str = "-fdiagnostics-color=always";

/// `color_diagnostics` (or `LIBCXX_COLOR_DIAGNOSTICS`) is a switch: set
/// to the empty string it requests color, any other value is an error.
pub fn configure_color_diagnostics(state: &mut ResolutionState) -> Result<()> {
    let requested = state
        .params
        .get("color_diagnostics")
        .or_else(|| state.params.env("LIBCXX_COLOR_DIAGNOSTICS"))
        .map(str::to_string);
    let Some(value) = requested else {
        return Ok(());
    };
    if !value.is_empty() {
        return Err(ResolveError::unsupported("color_diagnostics", value));
    }
    if !state.add_if_supported(FlagClass::General, &[COLOR_FLAG]) {
        state.warn("color diagnostics have been requested but are not supported by the compiler");
    }
    Ok(())
}

/// `debug_level` selects the library's assertion level.
pub fn configure_debug_mode(state: &mut ResolutionState) -> Result<()> {
    let Some(level) = state.params.get_non_empty("debug_level").map(str::to_string) else {
        return Ok(());
    };
    if level != "0" && level != "1" {
        return Err(ResolveError::unsupported("debug_level", level));
    }
    state.flags.push(FlagClass::Compile, format!("-D_LIBCUDACXX_DEBUG={level}"));
    Ok(())
}
