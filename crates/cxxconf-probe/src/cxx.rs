//! Process-backed compiler driver.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use cxxconf_core::{MacroMap, ProcessFailure};
use tempfile::TempDir;

use crate::driver::{CompilerDriver, Toolchain};

/// Command-line dialect of a compiler driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStyle {
    /// gcc, clang, icc and friends.
    Gnu,
    /// nvcc and the NVRTC wrapper.
    Nvcc,
    /// `cl.exe`.
    Msvc,
}

impl DriverStyle {
    /// Guess the style from the executable name.
    pub fn for_path(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if stem == "nvcc" || stem.starts_with("nvrtcc") {
            DriverStyle::Nvcc
        } else if stem == "cl" {
            DriverStyle::Msvc
        } else {
            DriverStyle::Gnu
        }
    }

    fn source_extension(&self) -> &'static str {
        match self {
            DriverStyle::Nvcc => "cu",
            DriverStyle::Gnu | DriverStyle::Msvc => "cpp",
        }
    }
}

/// Runs a real compiler binary with `std::process::Command`.
///
/// Every invocation gets a fresh scratch directory that is removed when
/// the call returns, on success and failure alike.
#[derive(Debug, Clone)]
pub struct CxxCompiler {
    path: PathBuf,
    first_arg: Option<String>,
    style: DriverStyle,
    env: BTreeMap<String, String>,
}

impl CxxCompiler {
    pub fn new(path: impl Into<PathBuf>, first_arg: Option<String>) -> Self {
        let path = path.into();
        let style = DriverStyle::for_path(&path);
        Self {
            path,
            first_arg,
            style,
            env: BTreeMap::new(),
        }
    }

    pub fn style(&self) -> DriverStyle {
        self.style
    }

    fn command_line(&self, args: &[String]) -> Vec<String> {
        let mut line = vec![self.path.display().to_string()];
        line.extend(self.first_arg.iter().cloned());
        line.extend(args.iter().cloned());
        line
    }

    fn run(&self, args: &[String]) -> Result<String, ProcessFailure> {
        let command = self.command_line(args);
        tracing::trace!(command = %command.join(" "), "running compiler");
        let mut cmd = Command::new(&self.path);
        if let Some(first) = &self.first_arg {
            cmd.arg(first);
        }
        cmd.args(args).envs(&self.env);
        match cmd.output() {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                if output.status.success() {
                    Ok(stdout)
                } else {
                    Err(ProcessFailure {
                        command,
                        stdout,
                        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                        exit_code: output.status.code(),
                    })
                }
            }
            Err(e) => Err(ProcessFailure {
                command,
                stdout: String::new(),
                stderr: e.to_string(),
                exit_code: None,
            }),
        }
    }

    /// Write a scratch source force-including `includes`.
    fn scratch_source(&self, includes: &[PathBuf]) -> std::io::Result<(TempDir, PathBuf)> {
        let dir = tempfile::Builder::new().prefix("cxxconf-probe").tempdir()?;
        let source = dir
            .path()
            .join(format!("probe.{}", self.style.source_extension()));
        let mut text = String::new();
        for include in includes {
            text.push_str(&format!("#include \"{}\"\n", include.display()));
        }
        fs::write(&source, text)?;
        Ok((dir, source))
    }

    fn scratch_failure(&self, args: &[String], err: std::io::Error) -> ProcessFailure {
        ProcessFailure {
            command: self.command_line(args),
            stdout: String::new(),
            stderr: format!("could not create a scratch source: {err}"),
            exit_code: None,
        }
    }
}

impl CompilerDriver for CxxCompiler {
    fn path(&self) -> &Path {
        &self.path
    }

    fn first_arg(&self) -> Option<&str> {
        self.first_arg.as_deref()
    }

    fn try_compile(&mut self, args: &[String]) -> bool {
        let Ok((dir, source)) = self.scratch_source(&[]) else {
            return false;
        };
        let object = dir.path().join("probe.o");
        let mut full = args.to_vec();
        match self.style {
            DriverStyle::Msvc => {
                full.push("/c".into());
                full.push(source.display().to_string());
                full.push(format!("/Fo{}", object.display()));
            }
            DriverStyle::Gnu | DriverStyle::Nvcc => {
                full.extend(["-c".to_string(), source.display().to_string()]);
                full.extend(["-o".to_string(), object.display().to_string()]);
            }
        }
        self.run(&full).is_ok()
    }

    fn dump_macros(&mut self, args: &[String], includes: &[PathBuf]) -> Result<MacroMap, ProcessFailure> {
        let (_dir, source) = self
            .scratch_source(includes)
            .map_err(|e| self.scratch_failure(args, e))?;
        let mut full = args.to_vec();
        match self.style {
            DriverStyle::Gnu => full.extend(["-dM", "-E"].map(String::from)),
            DriverStyle::Nvcc => full.extend(["-Xcompiler", "-dM", "-E"].map(String::from)),
            DriverStyle::Msvc => full.extend(["/Zc:preprocessor", "/PD", "/EP"].map(String::from)),
        }
        full.push(source.display().to_string());
        let output = self.run(&full)?;
        Ok(MacroMap::parse_dump(&output))
    }

    fn target_triple(&mut self, args: &[String]) -> Result<String, ProcessFailure> {
        match self.style {
            DriverStyle::Gnu => {
                let mut full = args.to_vec();
                full.push("-dumpmachine".into());
                Ok(self.run(&full)?.trim().to_string())
            }
            // Neither driver has a triple-reporting mode; derive one from
            // the target's predefined macros instead.
            DriverStyle::Nvcc | DriverStyle::Msvc => {
                let macros = self.dump_macros(args, &[])?;
                triple_from_macros(&macros).ok_or_else(|| ProcessFailure {
                    command: self.command_line(args),
                    stdout: String::new(),
                    stderr: "could not infer a target triple from predefined macros".into(),
                    exit_code: None,
                })
            }
        }
    }

    fn set_env(&mut self, env: &BTreeMap<String, String>) {
        self.env = env.clone();
    }
}

fn triple_from_macros(macros: &MacroMap) -> Option<String> {
    let arch = if macros.contains("__x86_64__") || macros.contains("_M_X64") {
        "x86_64"
    } else if macros.contains("__aarch64__") || macros.contains("_M_ARM64") {
        "aarch64"
    } else if macros.contains("__powerpc64__") && macros.contains("__LITTLE_ENDIAN__") {
        "powerpc64le"
    } else if macros.contains("__i386__") || macros.contains("_M_IX86") {
        "i686"
    } else {
        return None;
    };
    let rest = if macros.contains("_WIN32") {
        "pc-windows-msvc"
    } else if macros.contains("__APPLE__") {
        "apple-darwin"
    } else if macros.contains("__linux__") {
        "unknown-linux-gnu"
    } else {
        return None;
    };
    Some(format!("{arch}-{rest}"))
}

/// Finds compilers on the search path and drives them as processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToolchain;

impl Toolchain for SystemToolchain {
    fn find_executable(&self, name: &str, search_path: Option<&str>) -> Option<PathBuf> {
        let candidate = Path::new(name);
        if candidate.components().count() > 1 {
            return candidate.is_file().then(|| candidate.to_path_buf());
        }
        let paths: OsString = match search_path {
            Some(p) => p.into(),
            None => std::env::var_os("PATH")?,
        };
        for dir in std::env::split_paths(&paths) {
            let full = dir.join(name);
            if full.is_file() {
                return Some(full);
            }
            if cfg!(windows) {
                let exe = dir.join(format!("{name}.exe"));
                if exe.is_file() {
                    return Some(exe);
                }
            }
        }
        None
    }

    fn open(&self, path: &Path, first_arg: Option<&str>) -> Box<dyn CompilerDriver> {
        Box::new(CxxCompiler::new(path, first_arg.map(str::to_string)))
    }
}
