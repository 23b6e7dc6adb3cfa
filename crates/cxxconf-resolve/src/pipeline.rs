//! Resolution pipeline orchestrator.

use cxxconf_core::{Parameters, Result};
use cxxconf_probe::{CompilerProbe, SystemToolchain, Toolchain};
use cxxconf_targets::{make_target_info, HostEnvironment, TargetInfo, TargetInfoKind};

use crate::executor::Executor;
use crate::resolved::ResolvedConfig;
use crate::stages::{
    capabilities, compile, compiler, diagnostics, dialect, features, filesystem, link, modules, paths,
    sanitizer, target, warnings,
};
use crate::state::ResolutionState;

/// Run one stage inside its own span and fold parameter warnings into
/// the run log afterwards.
fn stage<T>(
    name: &'static str,
    state: &mut ResolutionState,
    run: impl FnOnce(&mut ResolutionState) -> Result<T>,
) -> Result<T> {
    let _span = tracing::debug_span!("stage", name).entered();
    let result = run(state);
    state.sync_diagnostics();
    if let Err(e) = &result {
        tracing::debug!(stage = name, error = %e, "stage failed");
    }
    result
}

/// Configures one resolution run.
///
/// Collaborators not supplied explicitly are taken from the running
/// system: the detected host, compilers found on `PATH` and the target
/// info named by the `target_info` parameter (or the host's own).
#[derive(Debug)]
pub struct Resolver {
    params: Parameters,
    host: Option<HostEnvironment>,
    toolchain: Option<Box<dyn Toolchain>>,
    target_info: Option<Box<dyn TargetInfo>>,
}

impl Resolver {
    pub fn new(params: Parameters) -> Self {
        Self {
            params,
            host: None,
            toolchain: None,
            target_info: None,
        }
    }

    pub fn with_host(mut self, host: HostEnvironment) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_toolchain(mut self, toolchain: impl Toolchain + 'static) -> Self {
        self.toolchain = Some(Box::new(toolchain));
        self
    }

    pub fn with_target_info(mut self, target_info: impl TargetInfo + 'static) -> Self {
        self.target_info = Some(Box::new(target_info));
        self
    }

    /// Run every stage in order. The first fatal error aborts the run.
    pub fn resolve(self) -> Result<ResolvedConfig> {
        let Resolver {
            mut params,
            host,
            toolchain,
            target_info,
        } = self;
        let host = host.unwrap_or_else(HostEnvironment::detect);
        let toolchain = toolchain.unwrap_or_else(|| Box::new(SystemToolchain));

        // Stage 1: executor, system library and target info
        let executor = Executor::from_params(&mut params)?;
        let system_cxx_lib = paths::system_cxx_lib(&params)?;
        let target_info = match target_info {
            Some(info) => info,
            None => {
                let kind = match params.get_non_empty("target_info") {
                    Some(name) => TargetInfoKind::parse(name)?,
                    None => TargetInfoKind::for_host(&host),
                };
                make_target_info(kind, &host)
            }
        };
        tracing::debug!(executor = %executor, target_info = ?target_info.kind(), "selected collaborators");

        // Stage 2: compiler identification
        let located = compiler::locate(&params, toolchain.as_ref())?;
        let driver = toolchain.open(&located.path, located.first_arg.as_deref());
        let cxx = CompilerProbe::identify(driver)?;
        let mut state = ResolutionState::new(params, host, toolchain, target_info, executor, cxx);
        state.system_cxx_lib = system_cxx_lib;
        stage("compiler", &mut state, |s| compiler::configure(s, &located))?;

        // Stage 3: triple, deployment, roots and the library under test
        stage("triple", &mut state, target::configure_triple)?;
        stage("deployment", &mut state, target::configure_deployment)?;
        stage("roots", &mut state, paths::configure_roots)?;
        stage("stdlib", &mut state, paths::configure_stdlib)?;
        stage("build_mode", &mut state, paths::configure_build_mode)?;
        stage("library_roots", &mut state, |s| {
            paths::configure_library_roots(s);
            Ok(())
        })?;

        // Stage 4: capabilities that gate later flags
        stage("verify", &mut state, capabilities::configure_verify)?;
        stage("thread_safety", &mut state, |s| {
            capabilities::configure_thread_safety(s);
            Ok(())
        })?;
        stage("no_execute", &mut state, |s| {
            capabilities::configure_no_execute(s);
            Ok(())
        })?;
        stage("execute_external", &mut state, capabilities::configure_execute_external)?;
        stage("ccache", &mut state, capabilities::configure_ccache)?;

        // Stage 5: dialect, compile and link flags
        stage("ccbin", &mut state, |s| {
            compile::configure_ccbin(s);
            Ok(())
        })?;
        stage("dialect", &mut state, dialect::configure_dialect)?;
        stage("compile_flags", &mut state, compile::configure_compile_flags)?;
        stage("filesystem", &mut state, filesystem::configure_filesystem)?;
        stage("link_flags", &mut state, link::configure_link_flags)?;
        stage("env", &mut state, |s| {
            link::configure_env(s);
            Ok(())
        })?;

        // Stage 6: per-axis flags that read the dialect and baseline
        stage("color_diagnostics", &mut state, diagnostics::configure_color_diagnostics)?;
        stage("debug_mode", &mut state, diagnostics::configure_debug_mode)?;
        stage("warnings", &mut state, warnings::configure_warnings)?;
        stage("sanitizer", &mut state, sanitizer::configure_sanitizer)?;
        stage("coverage", &mut state, sanitizer::configure_coverage)?;
        stage("modules", &mut state, modules::configure_modules)?;
        stage("coroutines", &mut state, modules::configure_coroutines)?;

        // Stage 7: features, then the substitution table from frozen flags
        stage("features", &mut state, features::configure_features)?;

        let resolved = ResolvedConfig::from_state(state);
        tracing::info!(
            features = resolved.features.len(),
            substitutions = resolved.substitutions.len(),
            probes = resolved.probe_stats.misses,
            "configuration resolved"
        );
        Ok(resolved)
    }
}

/// Resolve against the running system.
pub fn resolve(params: Parameters) -> Result<ResolvedConfig> {
    Resolver::new(params).resolve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::source_tree;
    use cxxconf_core::{ErrorKind, ResolveError};
    use cxxconf_probe::{ScriptedDriver, ScriptedToolchain};
    use cxxconf_targets::LinuxTargetInfo;

    fn resolver(driver: ScriptedDriver, params: Parameters) -> Resolver {
        Resolver::new(params)
            .with_host(HostEnvironment::linux_x86_64())
            .with_toolchain(ScriptedToolchain::new().with(driver))
            .with_target_info(LinuxTargetInfo::default())
    }

    #[test]
    fn gcc_run_reaches_the_substitution_table() {
        let src = source_tree();
        let params = Parameters::new()
            .with_param("cxx_under_test", "/usr/bin/g++")
            .with_param("libcxx_src_root", src.path().display().to_string());
        let config = resolver(ScriptedDriver::gcc("/usr/bin/g++", "12.2.0"), params)
            .resolve()
            .unwrap();

        assert!(config.has_feature("gcc-12"));
        assert!(config.has_feature("libc++"));
        assert!(config.has_feature("linux"));
        assert_eq!(config.dialect.as_ref().map(|d| d.as_str()), Some("c++2a"));
        let compile = config.substitutions.get("%compile").unwrap();
        assert!(compile.starts_with("/usr/bin/g++ -o %t.o %s -c "));
        assert!(compile.contains("-std=c++2a"));
        assert!(config.flags.link.iter().any(|f| f == "-lc++"));
        assert_eq!(config.roots.exec_root, src.path().join("test"));
    }

    #[test]
    fn missing_compiler_is_fatal_before_any_stage() {
        let src = source_tree();
        let params = Parameters::new()
            .with_param("cxx_under_test", "/opt/none/g++")
            .with_param("libcxx_src_root", src.path().display().to_string());
        let err = resolver(ScriptedDriver::gcc("/usr/bin/g++", "12.2.0"), params)
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ResolveError::CompilerNotFound { .. }));
        assert_eq!(err.kind(), ErrorKind::Toolchain);
    }

    #[test]
    fn unknown_target_info_is_rejected() {
        let params = Parameters::new()
            .with_param("cxx_under_test", "/usr/bin/g++")
            .with_param("target_info", "plan9");
        let err = Resolver::new(params)
            .with_host(HostEnvironment::linux_x86_64())
            .with_toolchain(ScriptedToolchain::new().with(ScriptedDriver::gcc("/usr/bin/g++", "12.2.0")))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedValue { .. }));
    }
}
