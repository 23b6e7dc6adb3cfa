//! Warning flags the tests compile with.

use cxxconf_core::{FlagClass, Result};

use crate::state::ResolutionState;

/// Probed one at a time; unknown ones are dropped.
const OPTIONAL_WARNINGS: [&str; 12] = [
    "-Wshadow",
    "-Wno-unused-command-line-argument",
    "-Wno-attributes",
    "-Wno-pessimizing-move",
    "-Wno-c++11-extensions",
    "-Wno-user-defined-literals",
    "-Wno-noexcept-type",
    "-Wno-aligned-allocation-unavailable",
    "-Wsign-compare",
    "-Wunused-variable",
    "-Wunused-parameter",
    "-Wunreachable-code",
];

const MSVC_DISABLED_WARNINGS: [&str; 4] = ["-wd4100", "-wd4127", "-wd4180", "-wd4309"];

pub fn configure_warnings(state: &mut ResolutionState) -> Result<()> {
    let default = state.has_feature("clang") || state.has_feature("msvc");
    let enabled = state.params.get_bool("enable_warnings", default)?;
    state.flags.set_use_warnings(enabled);

    if state.has_feature("nvcc") {
        state
            .flags
            .extend(FlagClass::Warning, ["-Xcudafe", "--display_error_number"]);
        if state.has_feature("msvc") {
            for flag in ["/W4", "/WX"].into_iter().chain(MSVC_DISABLED_WARNINGS) {
                state.flags.extend(FlagClass::Warning, ["-Xcompiler", flag]);
            }
        }
    } else {
        state.flags.extend(
            FlagClass::Warning,
            [
                "-D_LIBCUDACXX_DISABLE_PRAGMA_GCC_SYSTEM_HEADER",
                "-Wall",
                "-Wextra",
                "-Werror",
            ],
        );
        if state.add_warning_if_supported("-Wuser-defined-warnings") {
            state.features.add("diagnose-if-support");
        }
        for flag in OPTIONAL_WARNINGS {
            state.add_warning_if_supported(flag);
        }
    }

    // libc++'s C++03 static_assert emulation declares unused typedefs.
    let cxx03 = state.dialect.as_ref().is_some_and(|d| d.is_cxx03());
    if cxx03 && !state.has_feature("nvcc") {
        state.add_warning_if_supported("-Wno-unused-local-typedef");
    }
    Ok(())
}
