//! `cxxconf.toml` site configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use cxxconf_core::{Parameters, ResolveError};
use serde::Deserialize;

/// File name searched for from the working directory upwards.
pub const SITE_CONFIG_FILE: &str = "cxxconf.toml";

/// Environment variable naming a site configuration file.
pub const SITE_CONFIG_ENV: &str = "CXXCONF_SITE_CONFIG";

/// Parameters a build directory supplies below the command line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub params: BTreeMap<String, toml::Value>,
}

impl SiteConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Search `start_dir` and its ancestors for `cxxconf.toml`.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(SITE_CONFIG_FILE);
            if candidate.is_file() {
                return Ok(Some((Self::load(&candidate)?, candidate)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parameter values rendered as strings. Only strings, booleans and
    /// integers are meaningful parameter values.
    pub fn values(&self) -> Result<Vec<(String, String)>> {
        self.params
            .iter()
            .map(|(name, value)| {
                let rendered = match value {
                    toml::Value::String(s) => s.clone(),
                    toml::Value::Boolean(b) => b.to_string(),
                    toml::Value::Integer(i) => i.to_string(),
                    other => bail!("site parameter '{name}' has unsupported type {}", other.type_str()),
                };
                Ok((name.clone(), rendered))
            })
            .collect()
    }

    /// Install every value as a site-level parameter.
    pub fn apply(&self, params: &mut Parameters) -> Result<()> {
        for (name, value) in self.values()? {
            params.set_site(name, value);
        }
        Ok(())
    }
}

/// Locate the site configuration: the `site_config` parameter, else
/// `CXXCONF_SITE_CONFIG`, else an upward search from `cwd`.
///
/// A file named explicitly must exist; finding nothing by search is not
/// an error.
pub fn locate(params: &Parameters, cwd: &Path) -> Result<Option<(SiteConfig, PathBuf)>> {
    let named = params
        .get_non_empty("site_config")
        .map(|p| ("site_config", PathBuf::from(p)))
        .or_else(|| params.env(SITE_CONFIG_ENV).filter(|p| !p.is_empty()).map(|p| (SITE_CONFIG_ENV, PathBuf::from(p))));
    match named {
        Some((source, path)) => {
            let path = if path.is_absolute() { path } else { cwd.join(path) };
            if !path.is_file() {
                return Err(ResolveError::MissingPath {
                    param: source.into(),
                    path,
                    expected: "file",
                }
                .into());
            }
            Ok(Some((SiteConfig::load(&path)?, path)))
        }
        None => SiteConfig::find_and_load(cwd),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_render_scalars() {
        let config: SiteConfig = toml::from_str(
            r#"
            [params]
            cxx_under_test = "clang++"
            enable_modules = false
            debug_level = 1
            "#,
        )
        .unwrap();
        let values = config.values().unwrap();
        assert_eq!(
            values,
            vec![
                ("cxx_under_test".to_string(), "clang++".to_string()),
                ("debug_level".to_string(), "1".to_string()),
                ("enable_modules".to_string(), "false".to_string()),
            ]
        );
    }

    #[test]
    fn arrays_are_rejected() {
        let config: SiteConfig = toml::from_str("[params]\ncompile_flags = [\"-O2\"]\n").unwrap();
        let err = config.values().unwrap_err();
        assert!(err.to_string().contains("compile_flags"));
    }

    #[test]
    fn search_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SITE_CONFIG_FILE), "[params]\nstd = \"c++17\"\n").unwrap();
        let nested = dir.path().join("build").join("test");
        std::fs::create_dir_all(&nested).unwrap();

        let (config, path) = locate(&Parameters::new(), &nested).unwrap().unwrap();
        assert_eq!(path, dir.path().join(SITE_CONFIG_FILE));
        let mut params = Parameters::new();
        config.apply(&mut params).unwrap();
        assert_eq!(params.get("std"), Some("c++17"));
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let params = Parameters::new().with_param("site_config", "missing.toml");
        let err = locate(&params, dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::MissingPath { param, .. }) if param == "site_config"
        ));
    }

    #[test]
    fn environment_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lit.toml");
        std::fs::write(&file, "[params]\nuse_ccache = true\n").unwrap();
        let params = Parameters::new().with_env(SITE_CONFIG_ENV, file.display().to_string());
        let (config, path) = locate(&params, Path::new("/")).unwrap().unwrap();
        assert_eq!(path, file);
        assert_eq!(config.values().unwrap(), vec![("use_ccache".to_string(), "true".to_string())]);
    }
}
