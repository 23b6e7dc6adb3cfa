//! Compiler identity: vendor, version and default dialect.
//!
//! An identity is derived once from a predefined-macro dump and is
//! immutable afterwards.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::macros::MacroMap;

/// Three-component compiler version.
pub type Version = semver::Version;

/// Recognized compiler vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompilerVendor {
    Clang,
    AppleClang,
    Gcc,
    Nvcc,
    Nvhpc,
    Msvc,
    Icc,
}

impl CompilerVendor {
    /// The feature token naming this vendor.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerVendor::Clang => "clang",
            CompilerVendor::AppleClang => "apple-clang",
            CompilerVendor::Gcc => "gcc",
            CompilerVendor::Nvcc => "nvcc",
            CompilerVendor::Nvhpc => "nvhpc",
            CompilerVendor::Msvc => "msvc",
            CompilerVendor::Icc => "icc",
        }
    }

    /// Whether this is one of the clang flavors.
    pub fn is_clang(&self) -> bool {
        matches!(self, CompilerVendor::Clang | CompilerVendor::AppleClang)
    }
}

impl fmt::Display for CompilerVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A language-standard mode such as `c++17` or `gnu++1z`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Dialect(String);

impl Dialect {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The command-line flag selecting this dialect.
    pub fn flag(&self, msvc_style: bool) -> String {
        if msvc_style {
            format!("/std:{}", self.0)
        } else {
            format!("-std={}", self.0)
        }
    }

    /// Canonical feature token: GNU modes fold into `c++`, and the
    /// pre-publication abbreviations map to their year.
    pub fn feature_token(&self) -> String {
        let token = self.0.replace("gnu++", "c++");
        const ALIASES: [(&str, &str); 5] = [
            ("0x", "11"),
            ("1y", "14"),
            ("1z", "17"),
            ("2a", "20"),
            ("2b", "23"),
        ];
        for (alias, year) in ALIASES {
            if let Some(prefix) = token.strip_suffix(alias) {
                return format!("{prefix}{year}");
            }
        }
        token
    }

    /// Whether this is a pre-C++11 dialect.
    pub fn is_cxx03(&self) -> bool {
        matches!(self.feature_token().as_str(), "c++98" | "c++03")
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Facts about one compiler binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerIdentity {
    /// Path (or bare name) of the compiler executable.
    pub path: PathBuf,
    /// Argument inserted before every other argument.
    pub first_arg: Option<String>,
    pub vendor: Option<CompilerVendor>,
    pub version: Option<Version>,
    /// Dialect the compiler uses without a `-std` flag.
    pub default_dialect: Option<Dialect>,
    /// Whether this is the NVRTC device compiler wrapper.
    pub is_nvrtc: bool,
}

impl CompilerIdentity {
    /// Derive an identity from the compiler's predefined macros.
    pub fn from_macros(path: impl Into<PathBuf>, first_arg: Option<String>, macros: &MacroMap) -> Self {
        let path = path.into();
        let (vendor, version) = match detect_vendor(macros) {
            Some((vendor, version)) => (Some(vendor), Some(version)),
            None => (None, None),
        };
        let is_nvrtc = macros.contains("__CUDACC_RTC__")
            || path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s.starts_with("nvrtcc"));
        let default_dialect = default_dialect(macros, vendor);
        Self {
            path,
            first_arg,
            vendor,
            version,
            default_dialect,
            is_nvrtc,
        }
    }

    pub fn is(&self, vendor: CompilerVendor) -> bool {
        self.vendor == Some(vendor)
    }

    /// Version feature tokens down to `depth` components
    /// (`gcc`, `gcc-12`, `gcc-12.2`, `gcc-12.2.0`).
    pub fn feature_tokens(&self, depth: usize) -> Vec<String> {
        let (Some(vendor), Some(v)) = (self.vendor, self.version.as_ref()) else {
            return Vec::new();
        };
        let name = vendor.as_str();
        let all = [
            name.to_string(),
            format!("{name}-{}", v.major),
            format!("{name}-{}.{}", v.major, v.minor),
            format!("{name}-{}.{}.{}", v.major, v.minor, v.patch),
        ];
        all.into_iter().take(depth + 1).collect()
    }

    /// A stable string distinguishing this compiler from any other.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.path.display(),
            self.first_arg.as_deref().unwrap_or(""),
            self.vendor.map(|v| v.as_str()).unwrap_or("unknown"),
            self.version
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_default()
        )
    }
}

fn int(macros: &MacroMap, name: &str) -> u64 {
    macros
        .int_value(name)
        .and_then(|v| u64::try_from(v).ok())
        .unwrap_or(0)
}

fn triple(macros: &MacroMap, major: &str, minor: &str, patch: &str) -> Version {
    Version::new(int(macros, major), int(macros, minor), int(macros, patch))
}

fn detect_vendor(macros: &MacroMap) -> Option<(CompilerVendor, Version)> {
    // Wrappers and clang also define __GNUC__, so the order matters.
    if macros.contains("__NVCC__") {
        let v = triple(
            macros,
            "__CUDACC_VER_MAJOR__",
            "__CUDACC_VER_MINOR__",
            "__CUDACC_VER_BUILD__",
        );
        return Some((CompilerVendor::Nvcc, v));
    }
    if macros.contains("__NVCOMPILER") {
        let v = triple(
            macros,
            "__NVCOMPILER_MAJOR__",
            "__NVCOMPILER_MINOR__",
            "__NVCOMPILER_PATCHLEVEL__",
        );
        return Some((CompilerVendor::Nvhpc, v));
    }
    if macros.contains("__clang__") {
        let v = triple(macros, "__clang_major__", "__clang_minor__", "__clang_patchlevel__");
        let vendor = if macros.contains("__apple_build_version__") {
            CompilerVendor::AppleClang
        } else {
            CompilerVendor::Clang
        };
        return Some((vendor, v));
    }
    if macros.contains("__INTEL_COMPILER") {
        let raw = int(macros, "__INTEL_COMPILER");
        let v = Version::new(raw / 100, (raw % 100) / 10, int(macros, "__INTEL_COMPILER_UPDATE"));
        return Some((CompilerVendor::Icc, v));
    }
    if macros.contains("_MSC_VER") {
        let raw = int(macros, "_MSC_VER");
        let v = Version::new(raw / 100, raw % 100, int(macros, "_MSC_FULL_VER") % 100_000);
        return Some((CompilerVendor::Msvc, v));
    }
    if macros.contains("__GNUC__") {
        let v = triple(macros, "__GNUC__", "__GNUC_MINOR__", "__GNUC_PATCHLEVEL__");
        return Some((CompilerVendor::Gcc, v));
    }
    None
}

fn default_dialect(macros: &MacroMap, vendor: Option<CompilerVendor>) -> Option<Dialect> {
    let cplusplus = macros.int_value("__cplusplus")?;
    let year = match cplusplus {
        v if v <= 199711 => "03",
        v if v <= 201103 => "11",
        v if v <= 201402 => "14",
        v if v <= 201703 => "17",
        v if v <= 202002 => "20",
        _ => "23",
    };
    let gnu = vendor != Some(CompilerVendor::Msvc) && !macros.contains("__STRICT_ANSI__");
    let prefix = if gnu { "gnu++" } else { "c++" };
    Some(Dialect::new(format!("{prefix}{year}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn macros(pairs: &[(&str, &str)]) -> MacroMap {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn detects_gcc() {
        let m = macros(&[
            ("__GNUC__", "12"),
            ("__GNUC_MINOR__", "2"),
            ("__GNUC_PATCHLEVEL__", "0"),
            ("__cplusplus", "201703L"),
        ]);
        let id = CompilerIdentity::from_macros("g++", None, &m);
        assert!(id.is(CompilerVendor::Gcc));
        assert_eq!(id.version, Some(Version::new(12, 2, 0)));
        assert_eq!(id.default_dialect, Some(Dialect::new("gnu++17")));
        assert_eq!(
            id.feature_tokens(3),
            vec!["gcc", "gcc-12", "gcc-12.2", "gcc-12.2.0"]
        );
        assert_eq!(id.feature_tokens(2).len(), 3);
    }

    #[test]
    fn clang_wins_over_gnuc() {
        let m = macros(&[
            ("__GNUC__", "4"),
            ("__clang__", "1"),
            ("__clang_major__", "17"),
            ("__clang_minor__", "0"),
            ("__clang_patchlevel__", "6"),
            ("__STRICT_ANSI__", "1"),
            ("__cplusplus", "201402L"),
        ]);
        let id = CompilerIdentity::from_macros("/usr/bin/clang++", None, &m);
        assert!(id.is(CompilerVendor::Clang));
        assert_eq!(id.default_dialect, Some(Dialect::new("c++14")));
    }

    #[test]
    fn nvcc_and_nvrtc() {
        let m = macros(&[
            ("__NVCC__", "1"),
            ("__GNUC__", "11"),
            ("__CUDACC_VER_MAJOR__", "12"),
            ("__CUDACC_VER_MINOR__", "4"),
            ("__CUDACC_VER_BUILD__", "131"),
        ]);
        let id = CompilerIdentity::from_macros("nvcc", None, &m);
        assert!(id.is(CompilerVendor::Nvcc));
        assert!(!id.is_nvrtc);
        assert_eq!(id.version, Some(Version::new(12, 4, 131)));

        let id = CompilerIdentity::from_macros("/opt/bin/nvrtcc", None, &m);
        assert!(id.is_nvrtc);
    }

    #[test]
    fn unknown_vendor_has_no_tokens() {
        let id = CompilerIdentity::from_macros("cc", None, &MacroMap::new());
        assert!(id.vendor.is_none());
        assert!(id.feature_tokens(3).is_empty());
        assert!(id.default_dialect.is_none());
    }

    #[test]
    fn dialect_feature_tokens() {
        assert_eq!(Dialect::new("c++1z").feature_token(), "c++17");
        assert_eq!(Dialect::new("gnu++2a").feature_token(), "c++20");
        assert_eq!(Dialect::new("c++14").feature_token(), "c++14");
        assert_eq!(Dialect::new("gnu++03").feature_token(), "c++03");
        assert!(Dialect::new("c++03").is_cxx03());
        assert!(!Dialect::new("c++11").is_cxx03());
    }

    #[test]
    fn dialect_flags() {
        let d = Dialect::new("c++17");
        assert_eq!(d.flag(false), "-std=c++17");
        assert_eq!(d.flag(true), "/std:c++17");
    }
}
