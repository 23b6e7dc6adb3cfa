//! `cxxconf resolve`: resolve the configuration and print it.

use anyhow::Result;
use clap::ValueEnum;
use cxxconf_core::Parameters;
use cxxconf_resolve::{ResolvedConfig, Resolver};

/// Output format of `cxxconf resolve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// The human-readable summary followed by the substitution table.
pub fn render_text(config: &ResolvedConfig) -> String {
    let mut out = config.to_string();
    out.push('\n');
    out.push_str("--- Substitutions ---\n");
    for (placeholder, expansion) in config.substitutions.iter() {
        out.push_str(&format!("  {placeholder:<18} {expansion}\n"));
    }
    out
}

pub fn render(config: &ResolvedConfig, format: Format) -> Result<String> {
    match format {
        Format::Text => Ok(render_text(config)),
        Format::Json => Ok(config.to_json()?),
    }
}

pub fn run(params: Parameters, format: Format) -> Result<()> {
    let config = Resolver::new(params).resolve()?;
    println!("{}", render(&config, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxxconf_probe::{ScriptedDriver, ScriptedToolchain};
    use cxxconf_targets::{HostEnvironment, LinuxTargetInfo};
    use std::fs;

    fn resolved() -> ResolvedConfig {
        let src = tempfile::tempdir().unwrap();
        let root = src.path();
        fs::create_dir_all(root.join("include")).unwrap();
        fs::create_dir_all(root.join("test/std/input.output/filesystems/Inputs/static_test_env")).unwrap();
        fs::create_dir_all(root.join("test/support")).unwrap();
        fs::write(root.join("test/support/filesystem_dynamic_test_helper.py"), "").unwrap();
        let params = Parameters::new()
            .with_param("cxx_under_test", "g++")
            .with_param("libcxx_src_root", root.display().to_string());
        Resolver::new(params)
            .with_host(HostEnvironment::linux_x86_64())
            .with_toolchain(ScriptedToolchain::new().with(ScriptedDriver::gcc("/usr/bin/g++", "12.2.0")))
            .with_target_info(LinuxTargetInfo::default())
            .resolve()
            .unwrap()
    }

    #[test]
    fn text_ends_with_substitutions() {
        let text = render(&resolved(), Format::Text).unwrap();
        assert!(text.starts_with("=== Resolved Configuration ==="));
        let table = text.split("--- Substitutions ---").nth(1).unwrap();
        assert!(table.contains("%run"));
        assert!(table.contains("%t.exe"));
    }

    #[test]
    fn json_is_machine_readable() {
        let json = render(&resolved(), Format::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["compiler"]["vendor"], "gcc");
        assert!(value["features"].as_array().unwrap().iter().any(|f| f == "libc++"));
    }
}
