//! Host environment model.
//!
//! Describes the operating system and architecture that configuration
//! (and, for local execution, the tests) run on.

use std::process::Command;

use serde::{Deserialize, Serialize};

/// The host operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostOs {
    Linux,
    Darwin,
    Windows,
    FreeBsd,
    /// Any other OS; handled by the generic provider.
    Other,
}

impl HostOs {
    /// Map a `std::env::consts::OS` value.
    pub fn from_consts(os: &str) -> Self {
        match os {
            "linux" => HostOs::Linux,
            "macos" => HostOs::Darwin,
            "windows" => HostOs::Windows,
            "freebsd" => HostOs::FreeBsd,
            _ => HostOs::Other,
        }
    }

    /// Separator used when prepending to `PATH`-like variables.
    pub fn path_list_separator(&self) -> char {
        match self {
            HostOs::Windows => ';',
            _ => ':',
        }
    }
}

/// Model of the host configuration runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEnvironment {
    pub os: HostOs,
    /// Architecture name as reported by Rust (`x86_64`, `aarch64`, ...).
    pub arch: String,
    /// Whether the host is a consumer macOS system (as opposed to another
    /// Darwin flavor).
    pub is_macosx: bool,
}

impl HostEnvironment {
    /// Detect the current host.
    pub fn detect() -> Self {
        let os = HostOs::from_consts(std::env::consts::OS);
        let is_macosx = os == HostOs::Darwin && sw_vers("-productName").is_some_and(|name| {
            name.contains("Mac OS X") || name.contains("macOS")
        });
        Self {
            os,
            arch: std::env::consts::ARCH.to_string(),
            is_macosx,
        }
    }

    /// A Linux x86-64 host.
    pub fn linux_x86_64() -> Self {
        Self {
            os: HostOs::Linux,
            arch: "x86_64".into(),
            is_macosx: false,
        }
    }

    /// A macOS arm64 host.
    pub fn macosx_arm64() -> Self {
        Self {
            os: HostOs::Darwin,
            arch: "arm64".into(),
            is_macosx: true,
        }
    }

    /// A Windows x86-64 host.
    pub fn windows_x86_64() -> Self {
        Self {
            os: HostOs::Windows,
            arch: "x86_64".into(),
            is_macosx: false,
        }
    }

    pub fn is_windows(&self) -> bool {
        self.os == HostOs::Windows
    }

    pub fn is_darwin(&self) -> bool {
        self.os == HostOs::Darwin
    }
}

/// Run `sw_vers <arg>` and return its trimmed output.
pub(crate) fn sw_vers(arg: &str) -> Option<String> {
    let output = Command::new("sw_vers").arg(arg).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_mapping() {
        assert_eq!(HostOs::from_consts("linux"), HostOs::Linux);
        assert_eq!(HostOs::from_consts("macos"), HostOs::Darwin);
        assert_eq!(HostOs::from_consts("windows"), HostOs::Windows);
        assert_eq!(HostOs::from_consts("haiku"), HostOs::Other);
    }

    #[test]
    fn path_separators() {
        assert_eq!(HostOs::Windows.path_list_separator(), ';');
        assert_eq!(HostOs::Linux.path_list_separator(), ':');
    }

    #[test]
    fn detect_matches_build_host() {
        let host = HostEnvironment::detect();
        assert_eq!(host.arch, std::env::consts::ARCH);
        if host.os != HostOs::Darwin {
            assert!(!host.is_macosx);
        }
    }

    #[test]
    fn canned_hosts() {
        assert!(HostEnvironment::macosx_arm64().is_darwin());
        assert!(HostEnvironment::windows_x86_64().is_windows());
        assert!(!HostEnvironment::linux_x86_64().is_macosx);
    }
}
