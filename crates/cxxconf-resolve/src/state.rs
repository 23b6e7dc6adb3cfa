//! The configuration state threaded through the resolution stages.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cxxconf_core::{
    CompilerVendor, Diagnostics, Dialect, FeatureSet, FlagAccumulator, FlagClass, MacroMap,
    Parameters, ResolveError, Result,
};
use cxxconf_probe::{CompilerProbe, Toolchain};
use cxxconf_targets::{DeploymentTarget, HostEnvironment, TargetInfo, TargetTriple};
use serde::Serialize;

use crate::executor::Executor;

/// The standard library the suite is testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StdLib {
    #[serde(rename = "libc++")]
    LibCxx,
    #[serde(rename = "libstdc++")]
    LibStdCxx,
    #[serde(rename = "msvc")]
    Msvc,
    #[serde(rename = "cxx_default")]
    CxxDefault,
}

impl StdLib {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "libc++" => Ok(StdLib::LibCxx),
            "libstdc++" => Ok(StdLib::LibStdCxx),
            "msvc" => Ok(StdLib::Msvc),
            "cxx_default" => Ok(StdLib::CxxDefault),
            other => Err(ResolveError::unsupported("cxx_stdlib_under_test", other)),
        }
    }

    /// The parameter spelling, also used as the feature token.
    pub fn as_str(&self) -> &'static str {
        match self {
            StdLib::LibCxx => "libc++",
            StdLib::LibStdCxx => "libstdc++",
            StdLib::Msvc => "msvc",
            StdLib::CxxDefault => "cxx_default",
        }
    }
}

/// Whether the suite links a locally built library or one installed on
/// the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemCxxLib {
    /// Link the locally built library.
    Local,
    /// Link whatever the toolchain links by default.
    Default,
    /// Link the library found in this directory.
    Dir(PathBuf),
}

impl SystemCxxLib {
    pub fn is_system(&self) -> bool {
        !matches!(self, SystemCxxLib::Local)
    }
}

/// Source, build and library directories.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Roots {
    pub src_root: PathBuf,
    pub obj_root: Option<PathBuf>,
    pub library_root: Option<PathBuf>,
    pub runtime_root: Option<PathBuf>,
    pub abi_library_root: Option<PathBuf>,
    /// Where scratch output (module cache, filesystem sandbox) lives.
    pub exec_root: PathBuf,
}

impl Roots {
    /// `<src_root>/test/support`.
    pub fn support_dir(&self) -> PathBuf {
        self.src_root.join("test").join("support")
    }
}

/// Which environment overlay a `PATH` addition goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvTarget {
    /// Environment of compiler invocations.
    Compile,
    /// Environment of executed tests.
    Exec,
}

/// Everything resolved so far in one configuration run.
///
/// Owned by a single pipeline; nothing in it is shared with other runs.
#[derive(Debug)]
pub struct ResolutionState {
    pub params: Parameters,
    pub host: HostEnvironment,
    pub toolchain: Box<dyn Toolchain>,
    pub target_info: Box<dyn TargetInfo>,
    pub executor: Executor,
    pub cxx: CompilerProbe,
    /// Host compiler of a device compiler.
    pub host_cxx: Option<CompilerProbe>,
    pub features: FeatureSet,
    pub flags: FlagAccumulator,
    pub diagnostics: Diagnostics,
    /// Variables added to (or changed in) the compiler environment.
    pub compile_env: BTreeMap<String, String>,
    /// Variables added to (or changed in) the test environment.
    pub exec_env: BTreeMap<String, String>,
    pub system_cxx_lib: SystemCxxLib,
    pub link_shared: bool,
    pub debug_build: bool,
    pub use_target: bool,
    pub use_deployment: bool,
    pub target_triple: Option<TargetTriple>,
    pub deployment: Option<DeploymentTarget>,
    pub roots: Roots,
    pub stdlib: StdLib,
    pub dialect: Option<Dialect>,
    pub use_clang_verify: bool,
    pub execute_external: bool,
    pub use_ccache: bool,
    /// Feature macros found in the build-configuration header.
    pub config_site: MacroMap,
}

impl ResolutionState {
    pub fn new(
        params: Parameters,
        host: HostEnvironment,
        toolchain: Box<dyn Toolchain>,
        target_info: Box<dyn TargetInfo>,
        executor: Executor,
        cxx: CompilerProbe,
    ) -> Self {
        Self {
            params,
            host,
            toolchain,
            target_info,
            executor,
            cxx,
            host_cxx: None,
            features: FeatureSet::new(),
            flags: FlagAccumulator::new(),
            diagnostics: Diagnostics::new(),
            compile_env: BTreeMap::new(),
            exec_env: BTreeMap::new(),
            system_cxx_lib: SystemCxxLib::Local,
            link_shared: true,
            debug_build: false,
            use_target: false,
            use_deployment: false,
            target_triple: None,
            deployment: None,
            roots: Roots::default(),
            stdlib: StdLib::LibCxx,
            dialect: None,
            use_clang_verify: false,
            execute_external: false,
            use_ccache: false,
            config_site: MacroMap::new(),
        }
    }

    /// Move warnings recorded by the parameter layer into the run log so
    /// entries stay in the order they happened.
    pub fn sync_diagnostics(&mut self) {
        let mut pending = self.params.take_diagnostics();
        self.diagnostics.append(&mut pending);
    }

    pub fn note(&mut self, message: impl Into<String>) {
        self.sync_diagnostics();
        self.diagnostics.note(message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.sync_diagnostics();
        self.diagnostics.warn(message);
    }

    /// Whether the tests target Windows.
    pub fn is_windows(&self) -> bool {
        self.target_info.is_windows()
    }

    pub fn is_vendor(&self, vendor: CompilerVendor) -> bool {
        self.cxx.identity().is(vendor)
    }

    pub fn is_nvcc(&self) -> bool {
        self.is_vendor(CompilerVendor::Nvcc)
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    /// Whether the compiler under test accepts `flags` on top of the
    /// current baseline.
    pub fn supports(&mut self, flags: &[&str]) -> bool {
        let candidate: Vec<String> = flags.iter().map(|f| f.to_string()).collect();
        let baseline = self.flags.baseline();
        self.cxx.supports(&baseline, &candidate)
    }

    /// Append `flags` to `class` if the compiler accepts them.
    pub fn add_if_supported(&mut self, class: FlagClass, flags: &[&str]) -> bool {
        self.flags.push_if_supported(class, flags, &mut self.cxx)
    }

    /// Probe a warning flag (without the warning list itself) and add it
    /// to the warning flags if the compiler knows it.
    pub fn add_warning_if_supported(&mut self, flag: &str) -> bool {
        let mut baseline = self.flags.general.clone();
        baseline.extend(self.flags.compile.iter().cloned());
        if self.cxx.has_warning_flag(&baseline, flag) {
            self.flags.push(FlagClass::Warning, flag);
            true
        } else {
            false
        }
    }

    /// Prefix for a host-compiler flag: nvcc needs `-Xcompiler` in front.
    pub fn push_host_flag(&mut self, class: FlagClass, flag: impl Into<String>) {
        if self.is_nvcc() {
            self.flags.push(class, "-Xcompiler");
        }
        self.flags.push(class, flag);
    }

    /// Link flags embedding `dir` as a runtime search path.
    pub fn push_rpath(&mut self, dir: &Path) {
        self.push_host_flag(FlagClass::Link, format!("-Wl,-rpath,{}", dir.display()));
    }

    /// Prepend `path` to `PATH` in the chosen overlay.
    pub fn add_path(&mut self, target: EnvTarget, path: &Path) {
        let separator = self.host.os.path_list_separator();
        let overlay = match target {
            EnvTarget::Compile => &mut self.compile_env,
            EnvTarget::Exec => &mut self.exec_env,
        };
        let current = overlay
            .get("PATH")
            .cloned()
            .or_else(|| self.params.env("PATH").map(str::to_string));
        let entry = path.display().to_string();
        let value = match current {
            Some(rest) if !rest.is_empty() => format!("{entry}{separator}{rest}"),
            _ => entry,
        };
        overlay.insert("PATH".into(), value);
    }

    /// Hand the compiler environment overlay to every probe.
    pub fn push_compile_env(&mut self) {
        self.cxx.set_env(&self.compile_env);
        if let Some(host) = self.host_cxx.as_mut() {
            host.set_env(&self.compile_env);
        }
    }

    /// Shell-split a free-form flags parameter.
    pub fn split_param(&self, name: &str) -> Result<Vec<String>> {
        match self.params.get(name) {
            Some(raw) => shlex::split(raw).ok_or_else(|| ResolveError::unsupported(name, raw)),
            None => Ok(Vec::new()),
        }
    }

    /// The compiler that answers dialect and triple questions: the host
    /// compiler for a device compiler, else the compiler under test.
    pub fn host_side(&mut self) -> &mut CompilerProbe {
        match self.host_cxx.as_mut() {
            Some(host) => host,
            None => &mut self.cxx,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use cxxconf_probe::ScriptedDriver;

    #[test]
    fn stdlib_closed_set() {
        for name in ["libc++", "libstdc++", "msvc", "cxx_default"] {
            assert_eq!(StdLib::parse(name).unwrap().as_str(), name);
        }
        assert!(matches!(
            StdLib::parse("libc++abi"),
            Err(ResolveError::UnsupportedValue { .. })
        ));
    }

    #[test]
    fn add_path_prepends_to_environment() {
        let src = source_tree();
        let params = Parameters::new().with_env("PATH", "/usr/bin:/bin");
        let mut state = gcc_state(params, src.path());
        assert!(is_gcc(&state));
        state.add_path(EnvTarget::Exec, Path::new("/opt/lib"));
        state.add_path(EnvTarget::Exec, Path::new("/opt/abi"));
        assert_eq!(state.exec_env["PATH"], "/opt/abi:/opt/lib:/usr/bin:/bin");
        assert!(state.compile_env.is_empty());
    }

    #[test]
    fn rpath_wraps_for_nvcc() {
        let src = source_tree();
        let mut state = state_with(
            ScriptedDriver::nvcc("/usr/local/cuda/bin/nvcc", "12.2.0"),
            Parameters::new(),
            src.path(),
        );
        state.push_rpath(Path::new("/build/lib"));
        assert_eq!(state.flags.link, vec!["-Xcompiler", "-Wl,-rpath,/build/lib"]);
    }

    #[test]
    fn parameter_warnings_are_merged_in_order() {
        let src = source_tree();
        let params = Parameters::new()
            .with_param("enable_modules", "false")
            .with_env("LIBCXX_ENABLE_MODULES", "true");
        let mut state = gcc_state(params, src.path());
        state.note("before");
        assert!(state.params.get_bool_env("enable_modules", false, "LIBCXX_ENABLE_MODULES").unwrap());
        state.note("after");
        let messages: Vec<_> = state.diagnostics.entries().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], "before");
        assert!(messages[1].contains("LIBCXX_ENABLE_MODULES=true"));
        assert_eq!(messages[2], "after");
    }
}
