//! Platform knowledge for test-suite configuration.
//!
//! A target description is assembled from:
//! - **Host environment:** the OS and architecture configuration runs on
//! - **Target info:** per-OS flags, environment variables and features
//! - **Triple / deployment:** the normalized target triple or, on Apple
//!   hosts, the OS-version floor the tests are built against

pub mod deployment;
pub mod environment;
pub mod platform;
pub mod triple;

pub use deployment::{dylib_gaps, parse_platform_name, DeploymentTarget, DylibGap};
pub use environment::{HostEnvironment, HostOs};
pub use platform::{
    make_target_info, DarwinTargetInfo, FreeBsdTargetInfo, GenericTargetInfo, LinkOptions,
    LinuxTargetInfo, RuntimeRoots, TargetInfo, TargetInfoKind, WindowsTargetInfo,
};
pub use triple::{normalize_triple, TargetTriple};
