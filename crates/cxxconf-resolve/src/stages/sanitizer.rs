//! Sanitizer runtimes and coverage instrumentation.

use std::path::Path;

use cxxconf_core::{FlagClass, ResolveError, Result};

use crate::state::ResolutionState;

/// The sanitizer selected by `use_sanitizer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sanitizer {
    Address,
    /// `Address;Undefined` in either order.
    AddressUndefined,
    Memory,
    MemoryWithOrigins,
    Undefined,
    Thread,
}

impl Sanitizer {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "Address" => Ok(Sanitizer::Address),
            "Address;Undefined" | "Undefined;Address" => Ok(Sanitizer::AddressUndefined),
            "Memory" => Ok(Sanitizer::Memory),
            "MemoryWithOrigins" => Ok(Sanitizer::MemoryWithOrigins),
            "Undefined" => Ok(Sanitizer::Undefined),
            "Thread" => Ok(Sanitizer::Thread),
            other => Err(ResolveError::unsupported("use_sanitizer", other)),
        }
    }
}

/// `llvm-symbolizer` next to the compiler, else on the search path.
fn find_symbolizer(state: &ResolutionState) -> Option<String> {
    let separator = state.host.os.path_list_separator();
    let mut search = Vec::new();
    if let Some(dir) = state.cxx.identity().path.parent().filter(|d| !d.as_os_str().is_empty()) {
        search.push(dir.display().to_string());
    }
    if let Some(path) = state.params.env("PATH") {
        search.push(path.to_string());
    }
    let search = search.join(separator.to_string().as_str());
    state
        .toolchain
        .find_executable("llvm-symbolizer", Some(&search))
        .map(|p| p.display().to_string())
}

fn add_ubsan(state: &mut ResolutionState) {
    state.flags.extend(
        FlagClass::General,
        [
            "-fsanitize=undefined",
            "-fno-sanitize=float-divide-by-zero",
            "-fno-sanitize-recover=all",
        ],
    );
    state.exec_env.insert("UBSAN_OPTIONS".into(), "print_stacktrace=1".into());
    state.features.add("ubsan");
}

pub fn configure_sanitizer(state: &mut ResolutionState) -> Result<()> {
    let name = state.params.get_or("use_sanitizer", "").trim().to_string();
    if name.is_empty() {
        return Ok(());
    }
    let sanitizer = Sanitizer::parse(&name)?;
    state.target_info.add_sanitizer_features(&name, &mut state.features);
    let symbolizer = find_symbolizer(state);

    state.flags.extend(FlagClass::General, ["-g", "-fno-omit-frame-pointer"]);
    match sanitizer {
        Sanitizer::Address | Sanitizer::AddressUndefined => {
            state.flags.push(FlagClass::General, "-fsanitize=address");
            if let Some(symbolizer) = symbolizer {
                state.exec_env.insert("ASAN_SYMBOLIZER_PATH".into(), symbolizer);
            }
            // ODR violation detection reports false positives for the
            // library's inline variables.
            state
                .exec_env
                .insert("ASAN_OPTIONS".into(), "detect_odr_violation=0".into());
            state.features.add_all(["asan", "sanitizer-new-delete"]);
            state.flags.push(FlagClass::Compile, "-O1");
            if sanitizer == Sanitizer::AddressUndefined {
                add_ubsan(state);
            }
        }
        Sanitizer::Memory | Sanitizer::MemoryWithOrigins => {
            state.flags.push(FlagClass::General, "-fsanitize=memory");
            if sanitizer == Sanitizer::MemoryWithOrigins {
                state.flags.push(FlagClass::Compile, "-fsanitize-memory-track-origins");
            }
            if let Some(symbolizer) = symbolizer {
                state.exec_env.insert("MSAN_SYMBOLIZER_PATH".into(), symbolizer);
            }
            state.features.add_all(["msan", "sanitizer-new-delete"]);
            state.flags.push(FlagClass::Compile, "-O1");
        }
        Sanitizer::Undefined => {
            add_ubsan(state);
            state.flags.push(FlagClass::Compile, "-O2");
        }
        Sanitizer::Thread => {
            state.flags.push(FlagClass::General, "-fsanitize=thread");
            state.features.add_all(["tsan", "sanitizer-new-delete"]);
        }
    }

    if let Some(library) = state.params.get_non_empty("sanitizer_library").map(str::to_string) {
        if let Some(dir) = Path::new(&library).parent() {
            state.push_rpath(dir);
        }
    }
    Ok(())
}

pub fn configure_coverage(state: &mut ResolutionState) -> Result<()> {
    if state.params.get_bool("generate_coverage", false)? {
        state.flags.extend(FlagClass::General, ["-g", "--coverage"]);
        state.flags.push(FlagClass::Compile, "-O0");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::*;
    use cxxconf_core::Parameters;
    use cxxconf_probe::{ScriptedDriver, ScriptedToolchain};

    fn count(flags: &[String], flag: &str) -> usize {
        flags.iter().filter(|f| *f == flag).count()
    }

    #[test]
    fn address_and_undefined_combined() {
        let src = source_tree();
        for name in ["Address;Undefined", "Undefined;Address"] {
            let params = Parameters::new().with_param("use_sanitizer", name);
            let mut state = gcc_state(params, src.path());
            configure_sanitizer(&mut state).unwrap();
            for feature in ["asan", "ubsan", "sanitizer-new-delete"] {
                assert!(state.has_feature(feature), "{name}: {feature}");
            }
            assert_eq!(count(&state.flags.general, "-fsanitize=address"), 1);
            assert_eq!(count(&state.flags.general, "-fsanitize=undefined"), 1);
            assert_eq!(state.exec_env["ASAN_OPTIONS"], "detect_odr_violation=0");
            assert_eq!(state.exec_env["UBSAN_OPTIONS"], "print_stacktrace=1");
            assert_eq!(state.flags.compile, vec!["-O1"]);
        }
    }

    #[test]
    fn unknown_sanitizer_is_rejected_before_any_flag() {
        let src = source_tree();
        let params = Parameters::new().with_param("use_sanitizer", "Leak");
        let mut state = gcc_state(params, src.path());
        let err = configure_sanitizer(&mut state).unwrap_err();
        assert_eq!(err.to_string(), "unsupported value for \"use_sanitizer\": Leak");
        assert!(state.flags.general.is_empty());
    }

    #[test]
    fn memory_with_origins_and_symbolizer() {
        let src = source_tree();
        let params = Parameters::new().with_param("use_sanitizer", " MemoryWithOrigins ");
        let mut state = state_with(ScriptedDriver::clang("/opt/llvm/bin/clang++", "17.0.1"), params, src.path());
        state.toolchain = Box::new(
            ScriptedToolchain::new().with(ScriptedDriver::new("/opt/llvm/bin/llvm-symbolizer", Default::default())),
        );
        configure_sanitizer(&mut state).unwrap();
        assert_eq!(state.exec_env["MSAN_SYMBOLIZER_PATH"], "/opt/llvm/bin/llvm-symbolizer");
        assert_eq!(state.flags.compile, vec!["-fsanitize-memory-track-origins", "-O1"]);
        assert!(state.has_feature("msan"));
    }

    #[test]
    fn thread_sanitizer_and_library_rpath() {
        let src = source_tree();
        let params = Parameters::new()
            .with_param("use_sanitizer", "Thread")
            .with_param("sanitizer_library", "/opt/rt/libclang_rt.tsan.so");
        let mut state = gcc_state(params, src.path());
        configure_sanitizer(&mut state).unwrap();
        assert!(state.has_feature("tsan"));
        assert_eq!(state.flags.link, vec!["-Wl,-rpath,/opt/rt"]);
        assert!(state.flags.compile.is_empty());
    }

    #[test]
    fn undefined_alone() {
        let src = source_tree();
        let params = Parameters::new().with_param("use_sanitizer", "Undefined");
        let mut state = gcc_state(params, src.path());
        configure_sanitizer(&mut state).unwrap();
        assert!(state.has_feature("ubsan"));
        assert!(!state.has_feature("asan"));
        assert_eq!(state.flags.compile, vec!["-O2"]);
    }

    #[test]
    fn coverage_flags() {
        let src = source_tree();
        let params = Parameters::new().with_param("generate_coverage", "true");
        let mut state = gcc_state(params, src.path());
        configure_coverage(&mut state).unwrap();
        assert_eq!(state.flags.general, vec!["-g", "--coverage"]);
        assert_eq!(state.flags.compile, vec!["-O0"]);
    }
}
