//! Language dialect selection.

use cxxconf_core::{CompilerVendor, Dialect, FlagClass, ResolveError, Result};

use crate::state::ResolutionState;

/// Newest first.
pub const CANDIDATE_DIALECTS: [&str; 6] = ["c++2a", "c++17", "c++1z", "c++14", "c++11", "c++03"];

/// The candidates worth probing on this compiler. Old GCCs accept the
/// flags for standards they only partially implement.
fn candidates(state: &ResolutionState) -> Vec<&'static str> {
    let identity = state.cxx.identity();
    let gcc_major = match (identity.is(CompilerVendor::Gcc), identity.version.as_ref()) {
        (true, Some(version)) => Some(version.major),
        _ => None,
    };
    CANDIDATE_DIALECTS
        .into_iter()
        .filter(|d| match gcc_major {
            Some(major) if major < 7 && matches!(*d, "c++1z" | "c++17") => false,
            Some(major) if major < 6 && *d == "c++14" => false,
            _ => true,
        })
        .collect()
}

/// Whether `dialect` is usable. nvcc only warns when its host compiler
/// rejects a dialect, so both are asked.
fn accepts(state: &mut ResolutionState, dialect: &Dialect) -> bool {
    let baseline = state.flags.baseline();
    if state.is_nvcc() {
        if !state.cxx.supports_flag(&baseline, &dialect.flag(false)) {
            return false;
        }
        if let Some(host) = state.host_cxx.as_mut() {
            let msvc = host.identity().is(CompilerVendor::Msvc);
            return host.supports_flag(&[], &dialect.flag(msvc));
        }
        return true;
    }
    let msvc = state.is_vendor(CompilerVendor::Msvc);
    state.cxx.supports_flag(&baseline, &dialect.flag(msvc))
}

/// Resolve `std`: the explicit parameter, else the newest accepted
/// candidate, else the compiler's default dialect with no flag at all.
pub fn configure_dialect(state: &mut ResolutionState) -> Result<()> {
    let mut chosen = state.params.get_non_empty("std").map(Dialect::new);
    if chosen.is_none() {
        for name in candidates(state) {
            let dialect = Dialect::new(name);
            if accepts(state, &dialect) {
                state.note(format!("inferred language dialect as: {dialect}"));
                chosen = Some(dialect);
                break;
            }
        }
    }

    let dialect = match chosen {
        Some(dialect) => {
            let msvc = state.is_vendor(CompilerVendor::Msvc);
            state.flags.push(FlagClass::Compile, dialect.flag(msvc));
            dialect
        }
        None => {
            let fallback = state.host_side().identity().default_dialect.clone();
            let dialect = fallback.ok_or_else(|| ResolveError::ToolchainUnusable {
                detail: "no language dialect is accepted and the compiler reports no default".into(),
            })?;
            state.note(format!("using default language dialect: {dialect}"));
            dialect
        }
    };
    state.features.add(dialect.feature_token());
    state.dialect = Some(dialect);
    Ok(())
}
