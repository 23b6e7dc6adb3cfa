//! `cxxconf doctor`: report the host and compiler as configuration sees them.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use cxxconf_core::Parameters;
use cxxconf_probe::{CompilerProbe, SystemToolchain, Toolchain};
use cxxconf_resolve::stages::compiler;
use cxxconf_targets::{normalize_triple, HostEnvironment, TargetInfoKind};

use crate::site_config;

fn describe<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "unknown".into())
}

/// Build the doctor report. Problems are reported, never returned.
pub fn report(params: &Parameters, toolchain: &dyn Toolchain, host: &HostEnvironment, cwd: &Path) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, params, toolchain, host, cwd);
    out
}

fn write_report(
    out: &mut String,
    params: &Parameters,
    toolchain: &dyn Toolchain,
    host: &HostEnvironment,
    cwd: &Path,
) -> std::fmt::Result {
    writeln!(out, "=== cxxconf Doctor ===")?;
    writeln!(out)?;
    writeln!(out, "cxxconf version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out)?;

    writeln!(out, "--- Host ---")?;
    writeln!(out, "  OS:          {:?}", host.os)?;
    writeln!(out, "  Arch:        {}", host.arch)?;
    let kind = match params.get_non_empty("target_info") {
        Some(name) => match TargetInfoKind::parse(name) {
            Ok(kind) => format!("{kind:?}"),
            Err(e) => format!("error: {e}"),
        },
        None => format!("{:?} (host default)", TargetInfoKind::for_host(host)),
    };
    writeln!(out, "  Target info: {kind}")?;
    writeln!(out)?;

    writeln!(out, "--- Compiler ---")?;
    match compiler::locate(params, toolchain) {
        Ok(located) => {
            let inferred = if located.inferred { " (inferred)" } else { "" };
            writeln!(out, "  Path:     {}{inferred}", located.path.display())?;
            let driver = toolchain.open(&located.path, located.first_arg.as_deref());
            match CompilerProbe::identify(driver) {
                Ok(mut probe) => {
                    let identity = probe.identity().clone();
                    writeln!(out, "  Vendor:   {}", describe(identity.vendor))?;
                    writeln!(out, "  Version:  {}", describe(identity.version.as_ref()))?;
                    writeln!(out, "  Dialect:  {}", describe(identity.default_dialect.as_ref()))?;
                    if identity.is_nvrtc {
                        writeln!(out, "  NVRTC:    yes")?;
                    }
                    match probe.triple(&[]) {
                        Ok(triple) => writeln!(out, "  Triple:   {}", normalize_triple(&triple))?,
                        Err(e) => writeln!(out, "  Triple:   error: {e}")?,
                    }
                }
                Err(e) => writeln!(out, "  Identity: error: {e}")?,
            }
        }
        Err(e) => writeln!(out, "  not found: {e}")?,
    }
    writeln!(out)?;

    writeln!(out, "--- Site Configuration ---")?;
    match site_config::locate(params, cwd) {
        Ok(Some((config, path))) => {
            writeln!(out, "  {}: found at {}", site_config::SITE_CONFIG_FILE, path.display())?;
            writeln!(out, "  Parameters: {}", config.params.len())?;
        }
        Ok(None) => writeln!(out, "  {}: not found", site_config::SITE_CONFIG_FILE)?,
        Err(e) => writeln!(out, "  error: {e:#}")?,
    }
    Ok(())
}

pub fn run(params: &Parameters, cwd: &Path) -> Result<()> {
    let host = HostEnvironment::detect();
    print!("{}", report(params, &SystemToolchain, &host, cwd));
    Ok(())
}
