//! Deployment targets for platforms with an OS-version floor.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static PLATFORM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^0-9]+)([0-9.]*)$").expect("platform pattern is valid")
});

/// (architecture, platform name, version) the tests deploy against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentTarget {
    pub arch: String,
    /// Platform name such as `macosx` or `iphoneos`.
    pub name: String,
    pub version: String,
}

impl DeploymentTarget {
    /// The triple handed to the test runner, e.g. `arm64-apple-macosx13.0`.
    pub fn triple(&self) -> String {
        format!("{}-apple-{}{}", self.arch, self.name, self.version)
    }

    /// The three feature forms for `feature`:
    /// `F=<arch>-<name>`, `F=<name>`, `F=<name><version>`.
    pub fn feature_forms(&self, feature: &str) -> [String; 3] {
        [
            format!("{feature}={}-{}", self.arch, self.name),
            format!("{feature}={}", self.name),
            format!("{feature}={}{}", self.name, self.version),
        ]
    }

    /// `-arch` and `-m<name>-version-min` flags selecting this deployment.
    pub fn flags(&self) -> [String; 3] {
        [
            "-arch".to_string(),
            self.arch.clone(),
            format!("-m{}-version-min={}", self.name, self.version),
        ]
    }
}

/// Split a `platform` parameter such as `macosx10.14` into name and version.
///
/// The version is `None` when the parameter names only the platform.
pub fn parse_platform_name(platform: &str) -> Option<(String, Option<String>)> {
    let caps = PLATFORM_RE.captures(platform.trim())?;
    let name = caps.get(1)?.as_str().to_string();
    let version = caps
        .get(2)
        .map(|m| m.as_str())
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    Some((name, version))
}

/// A capability the system dylib lacks on old deployment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DylibGap {
    pub feature: &'static str,
    pub note: &'static str,
}

/// Known dylib gaps: (platform, first 10.x minor, last 10.x minor, gap).
///
/// These are historical facts about shipped OS releases.
const DYLIB_GAPS: &[(&str, u32, u32, DylibGap)] = &[
    (
        "macosx",
        7,
        11,
        DylibGap {
            feature: "dylib-has-no-shared_mutex",
            note: "shared_mutex is not supported by the deployment target",
        },
    ),
    (
        "macosx",
        7,
        13,
        DylibGap {
            feature: "dylib-has-no-bad_optional_access",
            note: "throwing bad_optional_access is not supported by the deployment target",
        },
    ),
    (
        "macosx",
        7,
        13,
        DylibGap {
            feature: "dylib-has-no-bad_variant_access",
            note: "throwing bad_variant_access is not supported by the deployment target",
        },
    ),
    (
        "macosx",
        7,
        13,
        DylibGap {
            feature: "dylib-has-no-bad_any_cast",
            note: "throwing bad_any_cast is not supported by the deployment target",
        },
    ),
    (
        "macosx",
        7,
        14,
        DylibGap {
            feature: "dylib-has-no-filesystem",
            note: "the deployment target does not support <filesystem>",
        },
    ),
];

/// Gaps that apply to a system library on `target`.
///
/// Versions match exactly (`10.9`, not `10.9.5`), as the table is keyed
/// on the two-component versions the platform reports.
pub fn dylib_gaps(target: &DeploymentTarget) -> Vec<DylibGap> {
    let minor = target
        .version
        .strip_prefix("10.")
        .and_then(|m| m.parse::<u32>().ok());
    let Some(minor) = minor else {
        return Vec::new();
    };
    DYLIB_GAPS
        .iter()
        .filter(|(name, lo, hi, _)| *name == target.name && (*lo..=*hi).contains(&minor))
        .map(|(_, _, _, gap)| *gap)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn macosx(version: &str) -> DeploymentTarget {
        DeploymentTarget {
            arch: "x86_64".into(),
            name: "macosx".into(),
            version: version.into(),
        }
    }

    #[test]
    fn triple_and_features() {
        let d = macosx("10.14");
        assert_eq!(d.triple(), "x86_64-apple-macosx10.14");
        let forms = d.feature_forms("availability");
        assert_eq!(forms[0], "availability=x86_64-macosx");
        assert_eq!(forms[1], "availability=macosx");
        assert_eq!(forms[2], "availability=macosx10.14");
        assert_eq!(d.flags()[2], "-mmacosx-version-min=10.14");
    }

    #[test]
    fn parse_platform() {
        assert_eq!(
            parse_platform_name("macosx10.14"),
            Some(("macosx".into(), Some("10.14".into())))
        );
        assert_eq!(parse_platform_name("iphoneos"), Some(("iphoneos".into(), None)));
        assert_eq!(parse_platform_name("10.14"), None);
    }

    #[test]
    fn gaps_for_old_releases() {
        let features: Vec<_> = dylib_gaps(&macosx("10.11")).iter().map(|g| g.feature).collect();
        assert_eq!(features.len(), 5);
        assert!(features.contains(&"dylib-has-no-shared_mutex"));

        let features: Vec<_> = dylib_gaps(&macosx("10.13")).iter().map(|g| g.feature).collect();
        assert_eq!(features.len(), 4);
        assert!(!features.contains(&"dylib-has-no-shared_mutex"));

        let features: Vec<_> = dylib_gaps(&macosx("10.14")).iter().map(|g| g.feature).collect();
        assert_eq!(features, vec!["dylib-has-no-filesystem"]);
    }

    #[test]
    fn no_gaps_for_new_or_other_platforms() {
        assert!(dylib_gaps(&macosx("10.15")).is_empty());
        assert!(dylib_gaps(&macosx("13.0")).is_empty());
        assert!(dylib_gaps(&macosx("10.9.5")).is_empty());
        let ios = DeploymentTarget {
            arch: "arm64".into(),
            name: "iphoneos".into(),
            version: "10.3".into(),
        };
        assert!(dylib_gaps(&ios).is_empty());
    }
}
