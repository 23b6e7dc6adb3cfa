//! Deterministic compiler stand-ins.
//!
//! A [`ScriptedDriver`] answers probes from tables instead of running a
//! process, so resolution can be exercised without a toolchain. Clones
//! share their [`ScriptedCounters`].

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use cxxconf_core::{MacroMap, ProcessFailure};

use crate::driver::{CompilerDriver, Toolchain};

/// Real invocations a scripted driver has answered.
#[derive(Debug, Default)]
pub struct ScriptedCounters {
    compiles: Cell<usize>,
    dumps: Cell<usize>,
    triples: Cell<usize>,
}

impl ScriptedCounters {
    pub fn compiles(&self) -> usize {
        self.compiles.get()
    }

    pub fn dumps(&self) -> usize {
        self.dumps.get()
    }

    pub fn triples(&self) -> usize {
        self.triples.get()
    }

    fn bump(cell: &Cell<usize>) {
        cell.set(cell.get() + 1);
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedDriver {
    path: PathBuf,
    first_arg: Option<String>,
    macros: MacroMap,
    /// Extra macros defined when an argument or include matches the trigger.
    conditional: Vec<(String, MacroMap)>,
    rejected: BTreeSet<String>,
    rejected_prefixes: Vec<String>,
    accepted: BTreeSet<String>,
    triple: Option<String>,
    failing_dumps: bool,
    env: BTreeMap<String, String>,
    counters: Rc<ScriptedCounters>,
}

fn macro_map(pairs: &[(&str, &str)]) -> MacroMap {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

fn split_version(version: &str) -> [String; 3] {
    let mut parts = version.split('.').map(str::to_string);
    [
        parts.next().unwrap_or_else(|| "0".into()),
        parts.next().unwrap_or_else(|| "0".into()),
        parts.next().unwrap_or_else(|| "0".into()),
    ]
}

impl ScriptedDriver {
    /// A driver predefining exactly `macros`, accepting every flag.
    pub fn new(path: impl Into<PathBuf>, macros: MacroMap) -> Self {
        Self {
            path: path.into(),
            first_arg: None,
            macros,
            conditional: Vec::new(),
            rejected: BTreeSet::new(),
            rejected_prefixes: Vec::new(),
            accepted: BTreeSet::new(),
            triple: Some("x86_64-unknown-linux-gnu".into()),
            failing_dumps: false,
            env: BTreeMap::new(),
            counters: Rc::new(ScriptedCounters::default()),
        }
    }

    /// A GCC in gnu++17 mode on x86_64 Linux.
    pub fn gcc(path: impl Into<PathBuf>, version: &str) -> Self {
        let [major, minor, patch] = split_version(version);
        let mut macros = macro_map(&[
            ("__cplusplus", "201703L"),
            ("__x86_64__", "1"),
            ("__linux__", "1"),
        ]);
        macros.insert("__GNUC__", major);
        macros.insert("__GNUC_MINOR__", minor);
        macros.insert("__GNUC_PATCHLEVEL__", patch);
        Self::new(path, macros)
    }

    /// A clang in gnu++17 mode on x86_64 Linux.
    pub fn clang(path: impl Into<PathBuf>, version: &str) -> Self {
        let [major, minor, patch] = split_version(version);
        let mut macros = macro_map(&[
            ("__cplusplus", "201703L"),
            ("__clang__", "1"),
            ("__GNUC__", "4"),
            ("__x86_64__", "1"),
            ("__linux__", "1"),
        ]);
        macros.insert("__clang_major__", major);
        macros.insert("__clang_minor__", minor);
        macros.insert("__clang_patchlevel__", patch);
        Self::new(path, macros)
    }

    /// An nvcc whose host preprocessor is a gnu++17 GCC.
    pub fn nvcc(path: impl Into<PathBuf>, version: &str) -> Self {
        let [major, minor, patch] = split_version(version);
        let mut driver = Self::gcc(path, "11.4.0");
        driver.macros.insert("__NVCC__", "1");
        driver.macros.insert("__CUDACC__", "1");
        driver.macros.insert("__CUDACC_VER_MAJOR__", major);
        driver.macros.insert("__CUDACC_VER_MINOR__", minor);
        driver.macros.insert("__CUDACC_VER_BUILD__", patch);
        driver
    }

    pub fn with_first_arg(mut self, arg: impl Into<String>) -> Self {
        self.first_arg = Some(arg.into());
        self
    }

    /// Fail any compile whose arguments include `flag`.
    pub fn reject(mut self, flag: impl Into<String>) -> Self {
        self.rejected.insert(flag.into());
        self
    }

    /// Fail any compile with an argument starting with `prefix`.
    pub fn reject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.rejected_prefixes.push(prefix.into());
        self
    }

    /// Exempt `flag` from the rejection rules.
    pub fn accept(mut self, flag: impl Into<String>) -> Self {
        self.accepted.insert(flag.into());
        self
    }

    /// Define extra macros when an argument, or an include's file name,
    /// equals `trigger`.
    pub fn macros_when(mut self, trigger: impl Into<String>, pairs: &[(&str, &str)]) -> Self {
        self.conditional.push((trigger.into(), macro_map(pairs)));
        self
    }

    pub fn with_macro(mut self, name: &str, value: &str) -> Self {
        self.macros.insert(name, value);
        self
    }

    pub fn with_triple(mut self, triple: Option<&str>) -> Self {
        self.triple = triple.map(str::to_string);
        self
    }

    /// Make every macro dump exit with status 1.
    pub fn failing_dumps(mut self) -> Self {
        self.failing_dumps = true;
        self
    }

    pub fn counters(&self) -> Rc<ScriptedCounters> {
        Rc::clone(&self.counters)
    }

    /// The environment last handed to the driver.
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    fn is_rejected(&self, arg: &str) -> bool {
        if self.accepted.contains(arg) {
            return false;
        }
        self.rejected.contains(arg) || self.rejected_prefixes.iter().any(|p| arg.starts_with(p.as_str()))
    }

    fn command(&self, args: &[String]) -> Vec<String> {
        let mut command = vec![self.path.display().to_string()];
        command.extend(self.first_arg.iter().cloned());
        command.extend(args.iter().cloned());
        command
    }
}

impl CompilerDriver for ScriptedDriver {
    fn path(&self) -> &Path {
        &self.path
    }

    fn first_arg(&self) -> Option<&str> {
        self.first_arg.as_deref()
    }

    fn try_compile(&mut self, args: &[String]) -> bool {
        ScriptedCounters::bump(&self.counters.compiles);
        !args.iter().any(|a| self.is_rejected(a))
    }

    fn dump_macros(&mut self, args: &[String], includes: &[PathBuf]) -> Result<MacroMap, ProcessFailure> {
        ScriptedCounters::bump(&self.counters.dumps);
        if self.failing_dumps || args.iter().any(|a| self.is_rejected(a)) {
            return Err(ProcessFailure {
                command: self.command(args),
                stdout: String::new(),
                stderr: "error: scripted macro dump failure\n".into(),
                exit_code: Some(1),
            });
        }
        let mut macros = self.macros.clone();
        for (trigger, extra) in &self.conditional {
            let by_arg = args.iter().any(|a| a == trigger);
            let by_include = includes
                .iter()
                .any(|p| p.file_name().and_then(|n| n.to_str()) == Some(trigger.as_str()));
            if by_arg || by_include {
                for (name, value) in extra.iter() {
                    macros.insert(name, value);
                }
            }
        }
        Ok(macros)
    }

    fn target_triple(&mut self, args: &[String]) -> Result<String, ProcessFailure> {
        ScriptedCounters::bump(&self.counters.triples);
        self.triple.clone().ok_or_else(|| ProcessFailure {
            command: self.command(&[args.to_vec(), vec!["-dumpmachine".into()]].concat()),
            stdout: String::new(),
            stderr: "error: unknown target\n".into(),
            exit_code: Some(1),
        })
    }

    fn set_env(&mut self, env: &BTreeMap<String, String>) {
        self.env = env.clone();
    }
}

/// Name-to-driver table standing in for the search path.
#[derive(Debug, Clone, Default)]
pub struct ScriptedToolchain {
    drivers: BTreeMap<String, ScriptedDriver>,
}

impl ScriptedToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `driver`, found under its full path and its file name.
    pub fn with(mut self, driver: ScriptedDriver) -> Self {
        let full = driver.path.display().to_string();
        if let Some(name) = driver.path.file_name().and_then(|n| n.to_str()) {
            self.drivers.insert(name.to_string(), driver.clone());
        }
        self.drivers.insert(full, driver);
        self
    }

    pub fn driver(&self, name: &str) -> Option<&ScriptedDriver> {
        self.drivers.get(name)
    }
}

impl Toolchain for ScriptedToolchain {
    fn find_executable(&self, name: &str, _search_path: Option<&str>) -> Option<PathBuf> {
        self.drivers.get(name).map(|d| d.path.clone())
    }

    fn open(&self, path: &Path, first_arg: Option<&str>) -> Box<dyn CompilerDriver> {
        let key = path.display().to_string();
        let mut driver = match self.drivers.get(&key) {
            Some(driver) => driver.clone(),
            // Unknown compilers predefine nothing and cannot dump macros.
            None => ScriptedDriver::new(path, MacroMap::new()).failing_dumps(),
        };
        if let Some(arg) = first_arg {
            driver.first_arg = Some(arg.to_string());
        }
        Box::new(driver)
    }
}
