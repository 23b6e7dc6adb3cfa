//! CLI command implementations.

pub mod doctor;
pub mod features;
pub mod resolve;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::Args;
use cxxconf_core::Parameters;

use crate::site_config;

/// Parameter sources shared by the resolving commands.
#[derive(Debug, Clone, Default, Args)]
pub struct ParamArgs {
    /// Set a parameter (repeatable)
    #[arg(short = 'p', long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
    /// Site configuration file (default: search for cxxconf.toml)
    #[arg(long)]
    pub site_config: Option<PathBuf>,
}

/// Split a `NAME=VALUE` argument. The value may be empty.
pub fn parse_param(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("parameter name is empty in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Layer the site file and command-line parameters over `base`.
pub fn build_parameters(args: &ParamArgs, mut base: Parameters, cwd: &Path) -> Result<Parameters> {
    for (name, value) in &args.params {
        base.set_param(name.clone(), value.clone());
    }
    if let Some(path) = &args.site_config {
        base.set_param("site_config", path.display().to_string());
    }
    match site_config::locate(&base, cwd)? {
        Some((config, path)) => {
            tracing::info!("using site configuration {}", path.display());
            config.apply(&mut base)?;
        }
        None => tracing::warn!("no site configuration found; running in the default configuration"),
    }
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_syntax() {
        assert_eq!(parse_param("std=c++17").unwrap(), ("std".into(), "c++17".into()));
        assert_eq!(parse_param("color_diagnostics=").unwrap(), ("color_diagnostics".into(), "".into()));
        assert_eq!(
            parse_param("compile_flags=-DA=1").unwrap(),
            ("compile_flags".into(), "-DA=1".into())
        );
        assert!(parse_param("std").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn command_line_beats_site_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(site_config::SITE_CONFIG_FILE),
            "[params]\nstd = \"c++14\"\nuse_ccache = false\n",
        )
        .unwrap();
        let args = ParamArgs {
            params: vec![("std".into(), "c++20".into())],
            site_config: None,
        };
        let params = build_parameters(&args, Parameters::new(), dir.path()).unwrap();
        assert_eq!(params.get("std"), Some("c++20"));
        assert_eq!(params.get("use_ccache"), Some("false"));
    }
}
