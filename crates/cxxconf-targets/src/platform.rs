//! Target-info providers.
//!
//! Each provider answers the OS-specific questions of the pipeline:
//! which features, flags and environment variables a platform implies.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use cxxconf_core::{FeatureSet, ResolveError};
use serde::Serialize;

use crate::deployment::DeploymentTarget;
use crate::environment::{sw_vers, HostEnvironment, HostOs};

/// Locales the test suite knows how to use, by their POSIX names.
const TEST_LOCALES: [&str; 6] = [
    "en_US.UTF-8",
    "fr_FR.UTF-8",
    "ru_RU.UTF-8",
    "zh_CN.UTF-8",
    "fr_CA.ISO8859-1",
    "cs_CZ.ISO8859-2",
];

/// Inputs for the per-platform system link flags.
#[derive(Debug, Clone, Default)]
pub struct LinkOptions {
    pub enable_threads: bool,
    pub llvm_unwinder: bool,
    pub link_shared: bool,
    /// Replacement for `-lgcc` when linking compiler-rt builtins.
    pub builtins_library: Option<String>,
    pub has_libatomic: bool,
    /// Whether a sanitizer runtime is linked.
    pub sanitizer: bool,
}

/// Library directories a test binary may need at run time.
#[derive(Debug, Clone, Default)]
pub struct RuntimeRoots {
    pub cxx_runtime_root: Option<PathBuf>,
    /// Directory of a system library under test, if one was given.
    pub system_cxx_lib: Option<PathBuf>,
    pub abi_library_root: Option<PathBuf>,
}

/// The closed set of providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetInfoKind {
    Linux,
    Darwin,
    Windows,
    FreeBsd,
    Generic,
}

impl TargetInfoKind {
    /// Provider for the given host.
    pub fn for_host(host: &HostEnvironment) -> Self {
        match host.os {
            HostOs::Linux => TargetInfoKind::Linux,
            HostOs::Darwin => TargetInfoKind::Darwin,
            HostOs::Windows => TargetInfoKind::Windows,
            HostOs::FreeBsd => TargetInfoKind::FreeBsd,
            HostOs::Other => TargetInfoKind::Generic,
        }
    }

    /// Parse a `target_info` parameter.
    pub fn parse(name: &str) -> Result<Self, ResolveError> {
        match name {
            "linux" => Ok(TargetInfoKind::Linux),
            "darwin" => Ok(TargetInfoKind::Darwin),
            "windows" => Ok(TargetInfoKind::Windows),
            "freebsd" => Ok(TargetInfoKind::FreeBsd),
            "generic" => Ok(TargetInfoKind::Generic),
            other => Err(ResolveError::unsupported("target_info", other)),
        }
    }
}

/// The platform-info collaborator.
pub trait TargetInfo: fmt::Debug {
    fn kind(&self) -> TargetInfoKind;

    /// Lower-case platform name, added as a feature.
    fn platform(&self) -> &str;

    fn is_windows(&self) -> bool {
        false
    }

    fn is_host_macosx(&self) -> bool {
        false
    }

    /// Deployment platform as `(inferred, name, version)`.
    ///
    /// `explicit` is the user's `platform` parameter, if any.
    fn platform_version(&self, _explicit: Option<&str>) -> Option<(bool, String, String)> {
        None
    }

    fn add_locale_features(&self, _features: &mut FeatureSet) {}

    fn add_cxx_compile_flags(&self, _deployment: Option<&DeploymentTarget>, _flags: &mut Vec<String>) {}

    fn add_cxx_link_flags(&self, _options: &LinkOptions, _flags: &mut Vec<String>) {}

    fn configure_env(&self, _roots: &RuntimeRoots, _env: &mut BTreeMap<String, String>) {}

    /// Whether the ABI library may be linked explicitly.
    fn allow_cxxabi_link(&self) -> bool {
        true
    }

    /// Whether lit's internal shell is the default.
    fn use_lit_shell_default(&self) -> bool {
        false
    }

    fn add_sanitizer_features(&self, _sanitizer: &str, _features: &mut FeatureSet) {}
}

/// Instantiate the provider for `kind`, probing the host where needed.
pub fn make_target_info(kind: TargetInfoKind, host: &HostEnvironment) -> Box<dyn TargetInfo> {
    match kind {
        TargetInfoKind::Linux => Box::new(LinuxTargetInfo::detect()),
        TargetInfoKind::Darwin => Box::new(DarwinTargetInfo::detect(host)),
        TargetInfoKind::Windows => Box::new(WindowsTargetInfo),
        TargetInfoKind::FreeBsd => Box::new(FreeBsdTargetInfo),
        TargetInfoKind::Generic => Box::new(GenericTargetInfo {
            platform: std::env::consts::OS.to_string(),
        }),
    }
}

fn normalize_locale(name: &str) -> String {
    name.to_ascii_lowercase().replace('-', "")
}

/// `locale -a`, or nothing if the tool is unavailable.
fn installed_locales() -> Vec<String> {
    match Command::new("locale").arg("-a").output() {
        Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn add_available_locales(installed: &[String], features: &mut FeatureSet) {
    let installed: Vec<String> = installed.iter().map(|l| normalize_locale(l)).collect();
    for locale in TEST_LOCALES {
        if installed.contains(&normalize_locale(locale)) {
            features.add(format!("locale.{locale}"));
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinuxTargetInfo {
    /// Locales installed on the host, as `locale -a` lists them.
    pub locales: Vec<String>,
}

impl LinuxTargetInfo {
    pub fn detect() -> Self {
        Self {
            locales: installed_locales(),
        }
    }
}

impl TargetInfo for LinuxTargetInfo {
    fn kind(&self) -> TargetInfoKind {
        TargetInfoKind::Linux
    }

    fn platform(&self) -> &str {
        "linux"
    }

    fn add_locale_features(&self, features: &mut FeatureSet) {
        add_available_locales(&self.locales, features);
    }

    fn add_cxx_compile_flags(&self, _deployment: Option<&DeploymentTarget>, flags: &mut Vec<String>) {
        flags.extend(
            [
                "-D__STDC_FORMAT_MACROS",
                "-D__STDC_LIMIT_MACROS",
                "-D__STDC_CONSTANT_MACROS",
            ]
            .map(String::from),
        );
    }

    fn add_cxx_link_flags(&self, options: &LinkOptions, flags: &mut Vec<String>) {
        flags.push("-lm".into());
        if !options.llvm_unwinder {
            flags.extend(["-lgcc_s", "-lgcc"].map(String::from));
        }
        if options.enable_threads {
            flags.push("-lpthread".into());
            if !options.link_shared {
                flags.push("-lrt".into());
            }
        }
        flags.push("-lc".into());
        if options.llvm_unwinder {
            flags.extend(["-lunwind", "-ldl"].map(String::from));
        } else {
            flags.push("-lgcc_s".into());
        }
        match &options.builtins_library {
            Some(lib) => flags.push(lib.clone()),
            None => flags.push("-lgcc".into()),
        }
        if options.has_libatomic {
            flags.push("-latomic".into());
        }
        if options.sanitizer {
            // Sanitizer runtime dependencies, in the order clang links them.
            flags.extend(["-lpthread", "-lrt", "-lm", "-ldl"].map(String::from));
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DarwinTargetInfo {
    pub is_host_macosx: bool,
    /// Host OS version (`sw_vers -productVersion`), major.minor only.
    pub os_version: Option<String>,
    pub locales: Vec<String>,
    /// Whether to ask `xcrun` for the SDK path.
    pub probe_sdk: bool,
}

impl DarwinTargetInfo {
    pub fn detect(host: &HostEnvironment) -> Self {
        let os_version = sw_vers("-productVersion").map(|v| {
            v.split('.').take(2).collect::<Vec<_>>().join(".")
        });
        Self {
            is_host_macosx: host.is_macosx,
            os_version,
            locales: installed_locales(),
            probe_sdk: true,
        }
    }

    fn xcrun(args: &[&str]) -> Option<String> {
        let output = Command::new("xcrun").args(args).output().ok()?;
        if !output.status.success() {
            return None;
        }
        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

impl TargetInfo for DarwinTargetInfo {
    fn kind(&self) -> TargetInfoKind {
        TargetInfoKind::Darwin
    }

    fn platform(&self) -> &str {
        "darwin"
    }

    fn is_host_macosx(&self) -> bool {
        self.is_host_macosx
    }

    fn platform_version(&self, explicit: Option<&str>) -> Option<(bool, String, String)> {
        let (name, version) = match explicit.and_then(crate::deployment::parse_platform_name) {
            Some((name, version)) => (name, version),
            None => ("macosx".to_string(), None),
        };
        if let Some(version) = version {
            return Some((false, name, version));
        }
        // For macosx what matters is the system dylib, not the SDK.
        let version = if name == "macosx" {
            self.os_version.clone()
        } else if self.probe_sdk {
            Self::xcrun(&["--sdk", &name, "--show-sdk-version"])
        } else {
            None
        }?;
        Some((true, name, version))
    }

    fn add_locale_features(&self, features: &mut FeatureSet) {
        add_available_locales(&self.locales, features);
    }

    fn add_cxx_compile_flags(&self, deployment: Option<&DeploymentTarget>, flags: &mut Vec<String>) {
        if !self.probe_sdk {
            return;
        }
        let sdk_path = match deployment {
            Some(d) => Self::xcrun(&["--sdk", &d.name, "--show-sdk-path"]),
            None => Self::xcrun(&["--show-sdk-path"]),
        };
        if let Some(path) = sdk_path {
            flags.extend(["-isysroot".to_string(), path]);
        }
    }

    fn add_cxx_link_flags(&self, _options: &LinkOptions, flags: &mut Vec<String>) {
        flags.push("-lSystem".into());
    }

    fn configure_env(&self, roots: &RuntimeRoots, env: &mut BTreeMap<String, String>) {
        let mut library_paths = Vec::new();
        if let Some(root) = roots.cxx_runtime_root.as_ref().or(roots.system_cxx_lib.as_ref()) {
            library_paths.push(root.display().to_string());
        }
        if let Some(root) = &roots.abi_library_root {
            library_paths.push(root.display().to_string());
        }
        if !library_paths.is_empty() {
            env.insert("DYLD_LIBRARY_PATH".into(), library_paths.join(":"));
        }
    }

    fn allow_cxxabi_link(&self) -> bool {
        // libc++ re-exports the ABI library's symbols on Apple platforms.
        false
    }

    fn add_sanitizer_features(&self, sanitizer: &str, features: &mut FeatureSet) {
        if sanitizer == "Undefined" {
            features.add("sanitizer-new-delete");
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsTargetInfo;

impl TargetInfo for WindowsTargetInfo {
    fn kind(&self) -> TargetInfoKind {
        TargetInfoKind::Windows
    }

    fn platform(&self) -> &str {
        "windows"
    }

    fn is_windows(&self) -> bool {
        true
    }

    fn allow_cxxabi_link(&self) -> bool {
        false
    }

    fn use_lit_shell_default(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FreeBsdTargetInfo;

impl TargetInfo for FreeBsdTargetInfo {
    fn kind(&self) -> TargetInfoKind {
        TargetInfoKind::FreeBsd
    }

    fn platform(&self) -> &str {
        "freebsd"
    }

    fn add_cxx_link_flags(&self, _options: &LinkOptions, flags: &mut Vec<String>) {
        flags.extend(["-lc", "-lm", "-lpthread", "-lgcc_s", "-lcxxrt"].map(String::from));
    }
}

/// Fallback for hosts without a dedicated provider.
#[derive(Debug, Clone, Default)]
pub struct GenericTargetInfo {
    pub platform: String,
}

impl TargetInfo for GenericTargetInfo {
    fn kind(&self) -> TargetInfoKind {
        TargetInfoKind::Generic
    }

    fn platform(&self) -> &str {
        &self.platform
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_kind() {
        assert_eq!(TargetInfoKind::parse("linux").unwrap(), TargetInfoKind::Linux);
        assert!(TargetInfoKind::parse("solaris").is_err());
        assert_eq!(
            TargetInfoKind::for_host(&HostEnvironment::windows_x86_64()),
            TargetInfoKind::Windows
        );
    }

    #[test]
    fn linux_locales_match_normalized_names() {
        let ti = LinuxTargetInfo {
            locales: vec!["C".into(), "en_US.utf8".into(), "fr_CA.iso88591".into()],
        };
        let mut features = FeatureSet::new();
        ti.add_locale_features(&mut features);
        assert!(features.contains("locale.en_US.UTF-8"));
        assert!(features.contains("locale.fr_CA.ISO8859-1"));
        assert!(!features.contains("locale.ru_RU.UTF-8"));
        assert_eq!(features.len(), 2);
    }

    #[test]
    fn linux_link_flags_default() {
        let mut flags = Vec::new();
        let options = LinkOptions {
            enable_threads: true,
            link_shared: true,
            ..Default::default()
        };
        LinuxTargetInfo::default().add_cxx_link_flags(&options, &mut flags);
        assert_eq!(
            flags,
            vec!["-lm", "-lgcc_s", "-lgcc", "-lpthread", "-lc", "-lgcc_s", "-lgcc"]
        );
    }

    #[test]
    fn linux_link_flags_llvm_unwinder_static() {
        let mut flags = Vec::new();
        let options = LinkOptions {
            enable_threads: true,
            llvm_unwinder: true,
            link_shared: false,
            builtins_library: Some("/rt/libclang_rt.builtins.a".into()),
            has_libatomic: true,
            sanitizer: false,
        };
        LinuxTargetInfo::default().add_cxx_link_flags(&options, &mut flags);
        assert_eq!(
            flags,
            vec![
                "-lm",
                "-lpthread",
                "-lrt",
                "-lc",
                "-lunwind",
                "-ldl",
                "/rt/libclang_rt.builtins.a",
                "-latomic"
            ]
        );
    }

    #[test]
    fn darwin_platform_version() {
        let ti = DarwinTargetInfo {
            is_host_macosx: true,
            os_version: Some("13.4".into()),
            ..Default::default()
        };
        assert_eq!(
            ti.platform_version(None),
            Some((true, "macosx".into(), "13.4".into()))
        );
        assert_eq!(
            ti.platform_version(Some("macosx10.14")),
            Some((false, "macosx".into(), "10.14".into()))
        );
        // No SDK probing: an unversioned non-mac platform cannot be inferred.
        assert_eq!(ti.platform_version(Some("iphoneos")), None);
    }

    #[test]
    fn darwin_env_prefers_runtime_root() {
        let roots = RuntimeRoots {
            cxx_runtime_root: Some("/build/lib".into()),
            system_cxx_lib: None,
            abi_library_root: Some("/abi/lib".into()),
        };
        let mut env = BTreeMap::new();
        DarwinTargetInfo::default().configure_env(&roots, &mut env);
        assert_eq!(env["DYLD_LIBRARY_PATH"], "/build/lib:/abi/lib");
        assert!(!DarwinTargetInfo::default().allow_cxxabi_link());
    }

    #[test]
    fn windows_defaults() {
        let ti = WindowsTargetInfo;
        assert!(ti.is_windows());
        assert!(ti.use_lit_shell_default());
        assert!(!ti.allow_cxxabi_link());
        assert_eq!(ti.platform(), "windows");
    }
}
