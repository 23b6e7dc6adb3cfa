//! Target triple and deployment-target resolution.

use cxxconf_core::{FlagClass, ResolveError, Result};
use cxxconf_targets::{dylib_gaps, normalize_triple, DeploymentTarget, TargetTriple};

use crate::state::ResolutionState;

/// Deployment targets need an Apple host and a clang-flavored compiler.
fn can_use_deployment(state: &ResolutionState) -> bool {
    state.target_info.platform() == "darwin"
        && state.target_info.is_host_macosx()
        && state.cxx.identity().vendor.is_some_and(|v| v.is_clang())
}

/// The raw triple of the compiler answering host-side questions.
fn compiler_triple(state: &mut ResolutionState) -> Result<String> {
    let baseline = state.flags.general.clone();
    state.host_side().triple(&baseline)
}

/// Resolve `target_triple`, or decide to use a deployment target instead.
pub fn configure_triple(state: &mut ResolutionState) -> Result<()> {
    let explicit = state.params.get_non_empty("target_triple").map(str::to_string);
    state.use_target = state.params.get_bool("use_target", false)?;
    if state.use_target && explicit.is_none() {
        state.warn("use_target is true but no triple is specified");
    }

    state.use_deployment = !state.use_target && can_use_deployment(state);
    if state.use_deployment {
        return Ok(());
    }

    if let Some(triple) = explicit {
        if state.use_target && triple.contains("apple") {
            state.warn("consider using arch and platform instead of target_triple on Apple platforms");
        }
        state.target_triple = Some(TargetTriple::new(triple));
        return Ok(());
    }

    let triple = normalize_triple(&compiler_triple(state)?);
    state.note(format!("inferred target_triple as: {triple}"));
    state.target_triple = Some(TargetTriple::new(triple));
    Ok(())
}

/// Resolve the deployment target and its dylib availability gaps.
pub fn configure_deployment(state: &mut ResolutionState) -> Result<()> {
    if !state.use_deployment {
        if state.params.get_non_empty("arch").is_some() {
            state.warn("ignoring arch, using target_triple");
        }
        if state.params.get_non_empty("platform").is_some() {
            state.warn("ignoring platform, using target_triple");
        }
        return Ok(());
    }

    let arch = match state.params.get_non_empty("arch") {
        Some(arch) => arch.to_string(),
        None => {
            let raw = compiler_triple(state)?;
            let arch = raw.split('-').next().unwrap_or_default().to_string();
            state.note(format!("inferred arch as: {arch}"));
            arch
        }
    };

    let explicit_platform = state.params.get_non_empty("platform").map(str::to_string);
    let (inferred, name, version) = state
        .target_info
        .platform_version(explicit_platform.as_deref())
        .ok_or_else(|| ResolveError::ToolchainUnusable {
            detail: "unable to determine the deployment platform and version".into(),
        })?;
    if inferred {
        state.note(format!("inferred platform as: {name}{version}"));
    }
    let deployment = DeploymentTarget { arch, name, version };
    let triple = deployment.triple();
    state.note(format!("computed target_triple as: {triple}"));
    state.target_triple = Some(TargetTriple::new(triple));

    // Availability markup only matters when testing a shipped dylib.
    if state.system_cxx_lib.is_system() {
        for gap in dylib_gaps(&deployment) {
            state.features.add(gap.feature);
            state.note(gap.note);
        }
    } else {
        state.flags.push(FlagClass::General, "-D_LIBCUDACXX_DISABLE_AVAILABILITY");
    }
    state.deployment = Some(deployment);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::*;
    use crate::state::SystemCxxLib;
    use cxxconf_core::Parameters;
    use cxxconf_probe::ScriptedDriver;
    use cxxconf_targets::DarwinTargetInfo;

    #[test]
    fn infers_and_normalizes_triple() {
        let src = source_tree();
        let driver = ScriptedDriver::gcc("g++", "12.2.0").with_triple(Some("x86_64-redhat-linux"));
        let mut state = state_with(driver, Parameters::new(), src.path());
        configure_triple(&mut state).unwrap();
        configure_deployment(&mut state).unwrap();
        assert_eq!(state.target_triple.as_ref().unwrap().as_str(), "x86_64-redhat-linux-gnu");
        assert!(!state.use_deployment);
        assert!(state.deployment.is_none());
    }

    #[test]
    fn explicit_triple_is_kept() {
        let src = source_tree();
        let params = Parameters::new()
            .with_param("target_triple", "aarch64-unknown-linux-gnu")
            .with_param("arch", "arm64");
        let driver = ScriptedDriver::gcc("g++", "12.2.0");
        let counters = driver.counters();
        let mut state = state_with(driver, params, src.path());
        configure_triple(&mut state).unwrap();
        configure_deployment(&mut state).unwrap();
        assert_eq!(state.target_triple.as_ref().unwrap().as_str(), "aarch64-unknown-linux-gnu");
        assert_eq!(counters.triples(), 0);
        assert!(state
            .diagnostics
            .warnings()
            .any(|w| w.message == "ignoring arch, using target_triple"));
    }

    #[test]
    fn use_target_without_triple_warns() {
        let src = source_tree();
        let params = Parameters::new().with_param("use_target", "true");
        let mut state = gcc_state(params, src.path());
        configure_triple(&mut state).unwrap();
        assert!(state
            .diagnostics
            .warnings()
            .any(|w| w.message.contains("no triple is specified")));
        assert!(state.target_triple.is_some());
    }

    fn darwin_state(params: Parameters, src: &std::path::Path) -> ResolutionState {
        let driver = ScriptedDriver::clang("/usr/bin/clang++", "15.0.0")
            .with_macro("__apple_build_version__", "15000040")
            .with_triple(Some("arm64-apple-darwin22.6.0"));
        let mut state = state_with(driver, params, src);
        state.target_info = Box::new(DarwinTargetInfo {
            is_host_macosx: true,
            os_version: Some("13.5".into()),
            ..Default::default()
        });
        state
    }

    #[test]
    fn deployment_on_macos_local_library() {
        let src = source_tree();
        let mut state = darwin_state(Parameters::new(), src.path());
        configure_triple(&mut state).unwrap();
        configure_deployment(&mut state).unwrap();
        assert!(state.use_deployment);
        let deployment = state.deployment.as_ref().unwrap();
        assert_eq!(deployment.arch, "arm64");
        assert_eq!(state.target_triple.as_ref().unwrap().as_str(), "arm64-apple-macosx13.5");
        assert_eq!(state.flags.general, vec!["-D_LIBCUDACXX_DISABLE_AVAILABILITY"]);
    }

    #[test]
    fn deployment_against_old_system_dylib() {
        let src = source_tree();
        let params = Parameters::new()
            .with_param("platform", "macosx10.13")
            .with_param("arch", "x86_64");
        let mut state = darwin_state(params, src.path());
        state.system_cxx_lib = SystemCxxLib::Default;
        configure_triple(&mut state).unwrap();
        configure_deployment(&mut state).unwrap();
        assert_eq!(state.target_triple.as_ref().unwrap().as_str(), "x86_64-apple-macosx10.13");
        assert!(state.has_feature("dylib-has-no-filesystem"));
        assert!(state.has_feature("dylib-has-no-bad_any_cast"));
        assert!(!state.has_feature("dylib-has-no-shared_mutex"));
        assert!(state.flags.general.is_empty());
    }
}
