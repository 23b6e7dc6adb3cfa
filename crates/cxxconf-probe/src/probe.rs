//! Cached capability queries against one compiler.

use std::collections::BTreeMap;
use std::path::PathBuf;

use cxxconf_core::{CompilerIdentity, FlagSupport, MacroMap, ResolveError, Result};
use sha2::{Digest, Sha256};

use crate::cache::{probe_key, CacheStats, ProbeAnswer, ProbeCache, ProbeKind};
use crate::driver::CompilerDriver;

/// A compiler plus everything learned about it during one run.
///
/// Each probe owns its cache; independent runs (or the host compiler of
/// a device compiler) get independent probes.
#[derive(Debug)]
pub struct CompilerProbe {
    driver: Box<dyn CompilerDriver>,
    identity: CompilerIdentity,
    cache: ProbeCache,
    triple: Option<String>,
    // Digest of the driver environment; part of every cache key.
    env_digest: String,
}

impl CompilerProbe {
    /// Identify the compiler behind `driver` from its predefined macros.
    ///
    /// A compiler that cannot even dump macros for an empty translation
    /// unit is unusable, so that failure is fatal.
    pub fn identify(mut driver: Box<dyn CompilerDriver>) -> Result<Self> {
        let macros = driver
            .dump_macros(&[], &[])
            .map_err(|failure| ResolveError::Toolchain {
                context: format!("unable to identify the compiler at {}", driver.path().display()),
                failure,
            })?;
        let identity = CompilerIdentity::from_macros(
            driver.path(),
            driver.first_arg().map(str::to_string),
            &macros,
        );
        tracing::debug!(
            path = %identity.path.display(),
            vendor = ?identity.vendor,
            version = ?identity.version,
            "identified compiler"
        );
        Ok(Self::with_identity(driver, identity))
    }

    /// Wrap a driver whose identity is already known.
    pub fn with_identity(driver: Box<dyn CompilerDriver>, identity: CompilerIdentity) -> Self {
        Self {
            driver,
            identity,
            cache: ProbeCache::new(),
            triple: None,
            env_digest: String::new(),
        }
    }

    pub fn identity(&self) -> &CompilerIdentity {
        &self.identity
    }

    pub fn driver(&self) -> &dyn CompilerDriver {
        self.driver.as_ref()
    }

    /// Environment for every later invocation. Answers cached under a
    /// different environment are not reused.
    pub fn set_env(&mut self, env: &BTreeMap<String, String>) {
        self.driver.set_env(env);
        let mut hasher = Sha256::new();
        for (name, value) in env {
            hasher.update((name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }
        self.env_digest = format!("{:x}", hasher.finalize());
    }

    fn key_scope(&self) -> String {
        format!("{}|{}", self.identity.fingerprint(), self.env_digest)
    }

    /// Whether a compile with `candidate` after `baseline` succeeds.
    pub fn supports(&mut self, baseline: &[String], candidate: &[String]) -> bool {
        let args: Vec<String> = baseline.iter().chain(candidate).cloned().collect();
        let key = probe_key(&self.key_scope(), ProbeKind::Compile, &args, &[]);
        if let Some(ProbeAnswer::Compiled(ok)) = self.cache.lookup(&key) {
            return *ok;
        }
        let ok = self.driver.try_compile(&args);
        tracing::debug!(flags = ?candidate, supported = ok, "flag probe");
        self.cache.store(key, ProbeAnswer::Compiled(ok));
        ok
    }

    pub fn supports_flag(&mut self, baseline: &[String], flag: &str) -> bool {
        self.supports(baseline, &[flag.to_string()])
    }

    /// Whether the warning flag is known to the compiler.
    ///
    /// `-Wno-foo` is accepted silently by most compilers even when `foo`
    /// does not exist, so the positive form `-Wfoo` is probed instead.
    pub fn has_warning_flag(&mut self, baseline: &[String], flag: &str) -> bool {
        let positive = match flag.strip_prefix("-Wno-") {
            Some(name) => format!("-W{name}"),
            None => flag.to_string(),
        };
        self.supports(baseline, &["-Werror".to_string(), positive])
    }

    fn cached_dump(&mut self, args: &[String], includes: &[PathBuf]) -> std::result::Result<MacroMap, cxxconf_core::ProcessFailure> {
        let key = probe_key(&self.key_scope(), ProbeKind::Macros, args, includes);
        if let Some(ProbeAnswer::Macros(answer)) = self.cache.lookup(&key) {
            return answer.clone();
        }
        let answer = self.driver.dump_macros(args, includes);
        self.cache.store(key, ProbeAnswer::Macros(answer.clone()));
        answer
    }

    /// Predefined macros under `args` with `includes` force-included.
    ///
    /// Failure indicates a broken toolchain and is fatal.
    pub fn dump_macros(&mut self, args: &[String], includes: &[PathBuf]) -> Result<MacroMap> {
        self.cached_dump(args, includes)
            .map_err(|failure| ResolveError::Toolchain {
                context: "failed to dump the compiler's predefined macros".into(),
                failure,
            })
    }

    /// Like [`CompilerProbe::dump_macros`], for probes whose failure only
    /// means the capability is missing.
    pub fn try_dump_macros(&mut self, args: &[String], includes: &[PathBuf]) -> Option<MacroMap> {
        self.cached_dump(args, includes).ok()
    }

    /// The compiler's target triple. Asked once, then remembered.
    pub fn triple(&mut self, args: &[String]) -> Result<String> {
        if let Some(triple) = &self.triple {
            return Ok(triple.clone());
        }
        let triple = self
            .driver
            .target_triple(args)
            .map_err(|failure| ResolveError::Toolchain {
                context: "failed to query the compiler's target triple".into(),
                failure,
            })?;
        self.triple = Some(triple.clone());
        Ok(triple)
    }

    /// Whether clang's `-verify` diagnostics mode is available.
    pub fn is_verify_supported(&mut self, baseline: &[String]) -> bool {
        self.supports(
            baseline,
            &["-Xclang".to_string(), "-verify-ignore-unexpected".to_string()],
        )
    }

    pub fn statistics(&self) -> CacheStats {
        self.cache.statistics()
    }
}

impl FlagSupport for CompilerProbe {
    fn supports_flags(&mut self, baseline: &[String], candidate: &[String]) -> bool {
        self.supports(baseline, candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedDriver;
    use cxxconf_core::{CompilerVendor, ErrorKind, FlagAccumulator, FlagClass};

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identifies_vendor() {
        let probe = CompilerProbe::identify(Box::new(ScriptedDriver::clang("clang++", "17.0.1"))).unwrap();
        assert!(probe.identity().is(CompilerVendor::Clang));
        assert_eq!(probe.identity().version.as_ref().map(|v| v.major), Some(17));
    }

    #[test]
    fn identify_fails_on_broken_compiler() {
        let err = CompilerProbe::identify(Box::new(
            ScriptedDriver::gcc("g++", "12.1.0").failing_dumps(),
        ))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Toolchain);
        let message = err.to_string();
        assert!(message.contains("Exit Code: 1"));
        assert!(message.contains("scripted macro dump failure"));
    }

    #[test]
    fn flag_probe_is_cached() {
        let driver = ScriptedDriver::gcc("g++", "12.2.0").reject("-fmodules");
        let counters = driver.counters();
        let mut probe = CompilerProbe::identify(Box::new(driver)).unwrap();
        let baseline = strings(&["-O2"]);

        assert!(probe.supports_flag(&baseline, "-Wall"));
        assert!(probe.supports_flag(&baseline, "-Wall"));
        assert!(!probe.supports_flag(&baseline, "-fmodules"));
        assert!(!probe.supports_flag(&baseline, "-fmodules"));
        assert_eq!(counters.compiles(), 2);
        assert_eq!(probe.statistics().hits, 2);

        // A different baseline is a different question.
        assert!(probe.supports_flag(&[], "-Wall"));
        assert_eq!(counters.compiles(), 3);
    }

    #[test]
    fn environment_change_invalidates_answers() {
        let driver = ScriptedDriver::gcc("g++", "12.2.0");
        let counters = driver.counters();
        let mut probe = CompilerProbe::identify(Box::new(driver)).unwrap();

        assert!(probe.supports_flag(&[], "-Wall"));
        let env = BTreeMap::from([("CCACHE_CPP2".to_string(), "1".to_string())]);
        probe.set_env(&env);
        assert!(probe.supports_flag(&[], "-Wall"));
        assert_eq!(counters.compiles(), 2);

        // The same environment again keeps the answers.
        probe.set_env(&env.clone());
        assert!(probe.supports_flag(&[], "-Wall"));
        assert_eq!(counters.compiles(), 2);
        let stats = probe.statistics();
        assert_eq!(stats.misses, stats.entries);
    }

    #[test]
    fn negative_warning_probes_positive_form() {
        let driver = ScriptedDriver::clang("clang++", "17.0.1").reject("-Wc++2a-extensions");
        let mut probe = CompilerProbe::identify(Box::new(driver)).unwrap();
        assert!(!probe.has_warning_flag(&[], "-Wno-c++2a-extensions"));
        assert!(probe.has_warning_flag(&[], "-Wno-unused-command-line-argument"));
    }

    #[test]
    fn triple_is_asked_once() {
        let driver = ScriptedDriver::gcc("g++", "12.2.0").with_triple(Some("x86_64-redhat-linux"));
        let counters = driver.counters();
        let mut probe = CompilerProbe::identify(Box::new(driver)).unwrap();
        assert_eq!(probe.triple(&[]).unwrap(), "x86_64-redhat-linux");
        assert_eq!(probe.triple(&strings(&["-m32"])).unwrap(), "x86_64-redhat-linux");
        assert_eq!(counters.triples(), 1);
    }

    #[test]
    fn try_dump_is_non_fatal() {
        let driver = ScriptedDriver::gcc("g++", "12.2.0").reject("-fcoroutines-ts");
        let mut probe = CompilerProbe::identify(Box::new(driver)).unwrap();
        assert!(probe.try_dump_macros(&strings(&["-fcoroutines-ts"]), &[]).is_none());
        assert!(probe.dump_macros(&strings(&["-fcoroutines-ts"]), &[]).is_err());
        assert!(probe.try_dump_macros(&[], &[]).is_some());
    }

    #[test]
    fn accumulator_gates_on_probe() {
        let mut probe = CompilerProbe::identify(Box::new(
            ScriptedDriver::gcc("g++", "12.2.0").reject("-fsized-deallocation"),
        ))
        .unwrap();
        let mut flags = FlagAccumulator::new();
        assert!(flags.push_if_supported(FlagClass::Compile, &["-ftemplate-depth=270"], &mut probe));
        assert!(!flags.push_if_supported(FlagClass::Compile, &["-fsized-deallocation"], &mut probe));
        assert_eq!(flags.compile, vec!["-ftemplate-depth=270"]);
    }
}
