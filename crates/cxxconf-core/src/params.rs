//! Layered parameter lookup.
//!
//! Precedence, highest first: a bound environment variable, an explicit
//! `--param`, the site configuration file, the compiled-in default.

use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostic::Diagnostics;
use crate::error::{ResolveError, Result};

/// Parse a boolean parameter value.
///
/// `1`/`true` are true and `""`/`0`/`false` are false, case-insensitively.
/// Anything else is a configuration error naming `param`.
pub fn parse_bool(param: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "" | "0" | "false" => Ok(false),
        _ => Err(ResolveError::InvalidBool {
            param: param.to_string(),
            value: value.to_string(),
        }),
    }
}

/// The parameter source for one configuration run.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    params: BTreeMap<String, String>,
    site: BTreeMap<String, String>,
    env: BTreeMap<String, String>,
    warned: BTreeSet<String>,
    diagnostics: Diagnostics,
}

impl Parameters {
    /// An empty parameter source with an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    pub fn from_process_env() -> Self {
        Self {
            env: std::env::vars().collect(),
            ..Self::default()
        }
    }

    /// Builder form of [`Parameters::set_param`].
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_param(name, value);
        self
    }

    /// Builder form of [`Parameters::set_env`].
    pub fn with_env(mut self, var: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_env(var, value);
        self
    }

    /// Set an explicit user parameter.
    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    /// Set a site-configuration value.
    pub fn set_site(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.site.insert(name.into(), value.into());
    }

    pub fn set_env(&mut self, var: impl Into<String>, value: impl Into<String>) {
        self.env.insert(var.into(), value.into());
    }

    /// Explicit parameter, else site value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .or_else(|| self.site.get(name))
            .map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// A value that must be present and non-empty.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }

    /// Look up a variable in the environment snapshot.
    pub fn env(&self, var: &str) -> Option<&str> {
        self.env.get(var).map(String::as_str)
    }

    pub fn env_map(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Resolve `name` with an optional environment override.
    ///
    /// A set environment variable wins; if it overrides an explicit
    /// value a warning naming both is recorded (once per parameter).
    pub fn resolve(&mut self, name: &str, env_var: Option<&str>, default: Option<&str>) -> Option<String> {
        let explicit = self.get(name).map(str::to_string);
        if let Some(var) = env_var {
            if let Some(value) = self.env.get(var).cloned() {
                if let Some(explicit) = &explicit {
                    if self.warned.insert(name.to_string()) {
                        self.diagnostics.warn(format!(
                            "Environment variable {var}={value} is overriding explicit \
                             --param={name}={explicit}"
                        ));
                    }
                }
                return Some(value);
            }
        }
        explicit.or_else(|| default.map(str::to_string))
    }

    /// Resolve and parse a boolean parameter.
    ///
    /// Returns `Ok(default)` if neither the variable nor the parameter is set.
    /// Errors name the environment variable when its value was the one parsed.
    pub fn get_bool_opt(
        &mut self,
        name: &str,
        default: Option<bool>,
        env_var: Option<&str>,
    ) -> Result<Option<bool>> {
        let from_env = env_var.filter(|var| self.env.contains_key(*var));
        match self.resolve(name, env_var, None) {
            Some(value) => parse_bool(from_env.unwrap_or(name), &value).map(Some),
            None => Ok(default),
        }
    }

    /// Boolean parameter with a definite default.
    pub fn get_bool(&mut self, name: &str, default: bool) -> Result<bool> {
        Ok(self.get_bool_opt(name, Some(default), None)?.unwrap_or(default))
    }

    /// Boolean parameter with a definite default and an overriding variable.
    pub fn get_bool_env(&mut self, name: &str, default: bool, env_var: &str) -> Result<bool> {
        Ok(self
            .get_bool_opt(name, Some(default), Some(env_var))?
            .unwrap_or(default))
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Take the recorded diagnostics, leaving an empty log.
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bool_vocabulary() {
        for v in ["1", "true", "TRUE", "True"] {
            assert!(parse_bool("p", v).unwrap(), "{v}");
        }
        for v in ["", "0", "false", "FALSE"] {
            assert!(!parse_bool("p", v).unwrap(), "{v}");
        }
        let err = parse_bool("enable_exceptions", "yes").unwrap_err();
        assert!(err.to_string().contains("enable_exceptions"));
        assert!(err.to_string().contains("yes"));
    }

    proptest! {
        #[test]
        fn bool_rejects_everything_else(s in "\\PC*") {
            let known = ["", "0", "1", "true", "false"];
            prop_assume!(!known.contains(&s.to_ascii_lowercase().as_str()));
            prop_assert!(parse_bool("p", &s).is_err());
        }
    }

    #[test]
    fn explicit_beats_site_beats_default() {
        let mut p = Parameters::new();
        assert_eq!(p.get_or("std", "c++17"), "c++17");
        p.set_site("std", "c++14");
        assert_eq!(p.get("std"), Some("c++14"));
        p.set_param("std", "c++11");
        assert_eq!(p.get("std"), Some("c++11"));
    }

    #[test]
    fn env_overrides_with_single_warning() {
        let mut p = Parameters::new()
            .with_param("enable_modules", "false")
            .with_env("LIBCXX_ENABLE_MODULES", "1");
        assert!(p.get_bool_env("enable_modules", false, "LIBCXX_ENABLE_MODULES").unwrap());
        assert!(p.get_bool_env("enable_modules", false, "LIBCXX_ENABLE_MODULES").unwrap());
        let warnings: Vec<_> = p.diagnostics().warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("LIBCXX_ENABLE_MODULES=1"));
        assert!(warnings[0].message.contains("--param=enable_modules=false"));
    }

    #[test]
    fn env_without_explicit_param_is_silent() {
        let mut p = Parameters::new().with_env("LIBCXX_ENABLE_MODULES", "true");
        assert!(p.get_bool_env("enable_modules", false, "LIBCXX_ENABLE_MODULES").unwrap());
        assert_eq!(p.diagnostics().warnings().count(), 0);
    }

    #[test]
    fn empty_env_value_is_false() {
        let mut p = Parameters::new()
            .with_param("enable_modules", "true")
            .with_env("LIBCXX_ENABLE_MODULES", "");
        assert!(!p.get_bool_env("enable_modules", true, "LIBCXX_ENABLE_MODULES").unwrap());
    }

    #[test]
    fn malformed_env_value_names_variable() {
        let mut p = Parameters::new().with_env("LIBCXX_ENABLE_MODULES", "sometimes");
        let err = p
            .get_bool_env("enable_modules", false, "LIBCXX_ENABLE_MODULES")
            .unwrap_err();
        assert!(err.to_string().contains("LIBCXX_ENABLE_MODULES"));
    }

    #[test]
    fn unset_bool_uses_default() {
        let mut p = Parameters::new();
        assert_eq!(p.get_bool_opt("use_clang_verify", None, None).unwrap(), None);
        assert!(p.get_bool("long_tests", true).unwrap());
    }
}
