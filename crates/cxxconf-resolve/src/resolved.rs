//! The frozen result of one resolution run.

use std::collections::BTreeMap;
use std::fmt;

use cxxconf_core::{CompilerIdentity, Diagnostics, Dialect, FeatureSet, FlagAccumulator, MacroMap};
use cxxconf_probe::CacheStats;
use cxxconf_targets::{DeploymentTarget, HostEnvironment, TargetInfoKind, TargetTriple};
use serde::Serialize;

use crate::executor::Executor;
use crate::state::{ResolutionState, Roots, StdLib};
use crate::substitutions::SubstitutionTable;

/// Everything the test runner needs, read-only once built.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub compiler: CompilerIdentity,
    /// Host compiler of a device compiler.
    pub host_compiler: Option<CompilerIdentity>,
    pub host: HostEnvironment,
    pub target_info: TargetInfoKind,
    pub target_triple: Option<TargetTriple>,
    pub deployment: Option<DeploymentTarget>,
    pub stdlib: StdLib,
    pub dialect: Option<Dialect>,
    pub executor: Executor,
    pub execute_external: bool,
    pub use_clang_verify: bool,
    pub use_ccache: bool,
    pub roots: Roots,
    pub flags: FlagAccumulator,
    pub features: FeatureSet,
    pub substitutions: SubstitutionTable,
    /// Variables the run adds to the compiler environment.
    pub compile_env: BTreeMap<String, String>,
    /// Variables the run adds to every test environment.
    pub exec_env: BTreeMap<String, String>,
    pub config_site: MacroMap,
    pub probe_stats: CacheStats,
    pub diagnostics: Diagnostics,
}

impl ResolvedConfig {
    /// Freeze `state`, building the substitution table from it.
    pub fn from_state(mut state: ResolutionState) -> Self {
        state.sync_diagnostics();
        let substitutions = SubstitutionTable::build(&state);
        let probe_stats = state.cxx.statistics();
        Self {
            compiler: state.cxx.identity().clone(),
            host_compiler: state.host_cxx.as_ref().map(|h| h.identity().clone()),
            host: state.host,
            target_info: state.target_info.kind(),
            target_triple: state.target_triple,
            deployment: state.deployment,
            stdlib: state.stdlib,
            dialect: state.dialect,
            executor: state.executor,
            execute_external: state.execute_external,
            use_clang_verify: state.use_clang_verify,
            use_ccache: state.use_ccache,
            roots: state.roots,
            flags: state.flags,
            features: state.features,
            substitutions,
            compile_env: state.compile_env,
            exec_env: state.exec_env,
            config_site: state.config_site,
            probe_stats,
            diagnostics: state.diagnostics,
        }
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    /// Sorted feature tokens.
    pub fn feature_list(&self) -> Vec<&str> {
        self.features.iter().collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, label: &str, items: &[String]) -> fmt::Result {
    if items.is_empty() {
        writeln!(f, "  {label}: (none)")
    } else {
        writeln!(f, "  {label}: {}", items.join(" "))
    }
}

impl fmt::Display for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Resolved Configuration ===")?;
        write!(f, "Compiler: {}", self.compiler.path.display())?;
        if let Some(first) = &self.compiler.first_arg {
            write!(f, " {first}")?;
        }
        writeln!(f)?;
        if let (Some(vendor), Some(version)) = (self.compiler.vendor, &self.compiler.version) {
            writeln!(f, "Vendor: {vendor} {version}")?;
        }
        if let Some(host) = &self.host_compiler {
            writeln!(f, "Host compiler: {}", host.path.display())?;
        }
        writeln!(f, "Standard library: {}", self.stdlib.as_str())?;
        if let Some(dialect) = &self.dialect {
            writeln!(f, "Dialect: {dialect}")?;
        }
        if let Some(triple) = &self.target_triple {
            writeln!(f, "Target: {triple}")?;
        }
        if let Some(deployment) = &self.deployment {
            writeln!(f, "Deployment: {}", deployment.triple())?;
        }
        writeln!(f, "Executor: {}", self.executor)?;

        writeln!(f)?;
        writeln!(f, "--- Flags ---")?;
        write_list(f, "General", &self.flags.general)?;
        write_list(f, "Compile", &self.flags.compile)?;
        if self.flags.use_warnings() {
            write_list(f, "Warnings", &self.flags.warning)?;
        }
        write_list(f, "Link", &self.flags.link)?;
        if !self.flags.modules.is_empty() {
            write_list(f, "Modules", &self.flags.modules)?;
        }

        writeln!(f)?;
        writeln!(f, "--- Features ({}) ---", self.features.len())?;
        for feature in self.features.iter() {
            writeln!(f, "  {feature}")?;
        }

        if !self.exec_env.is_empty() {
            writeln!(f)?;
            writeln!(f, "--- Environment ---")?;
            for (name, value) in &self.exec_env {
                writeln!(f, "  {name}={value}")?;
            }
        }

        let warnings = self.diagnostics.warnings().count();
        if warnings > 0 {
            writeln!(f)?;
            writeln!(f, "--- Warnings ({warnings}) ---")?;
            for warning in self.diagnostics.warnings() {
                writeln!(f, "  {}", warning.message)?;
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "Probes: {} run, {} cached",
            self.probe_stats.misses, self.probe_stats.hits
        )
    }
}
