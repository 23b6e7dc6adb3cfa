//! Toolchain capabilities and how tests will be driven.

use cxxconf_core::{FlagClass, Result};

use crate::state::ResolutionState;

/// `use_clang_verify`, probing for `-verify` support when unset.
pub fn configure_verify(state: &mut ResolutionState) -> Result<()> {
    let verify = match state.params.get_bool_opt("use_clang_verify", None, None)? {
        Some(explicit) => explicit,
        None => {
            // -verify itself always fails on an empty file, so probe the
            // companion flag instead.
            let baseline = state.flags.baseline();
            let supported = state.cxx.is_verify_supported(&baseline);
            state.note(format!("inferred use_clang_verify as: {supported}"));
            supported
        }
    };
    if verify {
        state.features.add("verify-support");
    }
    state.use_clang_verify = verify;
    Ok(())
}

/// Enable clang's thread-safety analysis as an error when available.
pub fn configure_thread_safety(state: &mut ResolutionState) {
    if state.add_if_supported(FlagClass::Compile, &["-Werror=thread-safety"]) {
        state.features.add("thread-safety");
        state.note("enabling thread-safety annotations");
    }
}

pub fn configure_no_execute(state: &mut ResolutionState) {
    if state.executor.is_noop() {
        state.features.add("no_execute");
    }
}

/// Choose between lit's internal shell and an external one.
///
/// `LIT_USE_INTERNAL_SHELL` (anything but `0` means yes) supplies the
/// default, else the target platform does.
pub fn configure_execute_external(state: &mut ResolutionState) -> Result<()> {
    let default = match state.params.env("LIT_USE_INTERNAL_SHELL") {
        Some(value) => value != "0",
        None => state.target_info.use_lit_shell_default(),
    };
    let use_lit_shell = state.params.get_bool("use_lit_shell", default)?;
    state.execute_external = !use_lit_shell;
    Ok(())
}

/// Prefix compiler commands with ccache when a launcher is configured.
pub fn configure_ccache(state: &mut ResolutionState) -> Result<()> {
    let default = state.params.env("CMAKE_CXX_COMPILER_LAUNCHER").is_some();
    state.use_ccache = state.params.get_bool("use_ccache", default)?;
    if state.use_ccache {
        state.note("enabling ccache");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Executor;
    use crate::state::testing::*;
    use cxxconf_core::{Parameters, ResolveError};
    use cxxconf_probe::ScriptedDriver;
    use cxxconf_targets::WindowsTargetInfo;

    #[test]
    fn verify_is_probed_when_unset() {
        let src = source_tree();
        let mut state = state_with(ScriptedDriver::clang("clang++", "17.0.1"), Parameters::new(), src.path());
        configure_verify(&mut state).unwrap();
        assert!(state.use_clang_verify);
        assert!(state.has_feature("verify-support"));

        let driver = ScriptedDriver::gcc("g++", "12.2.0").reject("-Xclang");
        let mut state = state_with(driver, Parameters::new(), src.path());
        configure_verify(&mut state).unwrap();
        assert!(!state.use_clang_verify);
        assert!(!state.has_feature("verify-support"));
    }

    #[test]
    fn explicit_verify_skips_probe() {
        let src = source_tree();
        let driver = ScriptedDriver::clang("clang++", "17.0.1");
        let counters = driver.counters();
        let params = Parameters::new().with_param("use_clang_verify", "false");
        let mut state = state_with(driver, params, src.path());
        configure_verify(&mut state).unwrap();
        assert!(!state.use_clang_verify);
        assert_eq!(counters.compiles(), 0);

        let params = Parameters::new().with_param("use_clang_verify", "maybe");
        let mut state = gcc_state(params, src.path());
        assert!(matches!(
            configure_verify(&mut state),
            Err(ResolveError::InvalidBool { .. })
        ));
    }

    #[test]
    fn thread_safety_gated_on_probe() {
        let src = source_tree();
        let driver = ScriptedDriver::gcc("g++", "12.2.0").reject("-Werror=thread-safety");
        let mut state = state_with(driver, Parameters::new(), src.path());
        configure_thread_safety(&mut state);
        assert!(!state.has_feature("thread-safety"));

        let mut state = state_with(ScriptedDriver::clang("clang++", "17.0.1"), Parameters::new(), src.path());
        configure_thread_safety(&mut state);
        assert!(state.has_feature("thread-safety"));
        assert_eq!(state.flags.compile, vec!["-Werror=thread-safety"]);
    }

    #[test]
    fn shell_and_executor_defaults() {
        let src = source_tree();
        let mut state = gcc_state(Parameters::new(), src.path());
        state.executor = Executor::Noop;
        configure_no_execute(&mut state);
        configure_execute_external(&mut state).unwrap();
        assert!(state.has_feature("no_execute"));
        assert!(state.execute_external);

        let mut state = gcc_state(Parameters::new(), src.path());
        state.target_info = Box::new(WindowsTargetInfo);
        configure_execute_external(&mut state).unwrap();
        assert!(!state.execute_external);

        let params = Parameters::new().with_env("LIT_USE_INTERNAL_SHELL", "0");
        let mut state = gcc_state(params, src.path());
        state.target_info = Box::new(WindowsTargetInfo);
        configure_execute_external(&mut state).unwrap();
        assert!(state.execute_external);
    }

    #[test]
    fn ccache_follows_launcher() {
        let src = source_tree();
        let params = Parameters::new().with_env("CMAKE_CXX_COMPILER_LAUNCHER", "ccache");
        let mut state = gcc_state(params, src.path());
        configure_ccache(&mut state).unwrap();
        assert!(state.use_ccache);

        let mut state = gcc_state(Parameters::new(), src.path());
        configure_ccache(&mut state).unwrap();
        assert!(!state.use_ccache);
    }
}
