//! Sandboxes for the `<filesystem>` tests.

use std::fs;
use std::path::{Path, PathBuf};

use cxxconf_core::{FlagClass, ResolveError, Result};

use crate::state::ResolutionState;

fn canonical_dir(param: &str, path: &Path) -> Result<PathBuf> {
    match fs::canonicalize(path) {
        Ok(canonical) if canonical.is_dir() => Ok(canonical),
        _ => Err(ResolveError::MissingPath {
            param: param.into(),
            path: path.to_path_buf(),
            expected: "directory",
        }),
    }
}

/// Point the tests at the read-only fixture tree, a scratch tree they may
/// modify, and the helper script that populates it.
pub fn configure_filesystem(state: &mut ResolutionState) -> Result<()> {
    if !state.params.get_bool("enable_filesystem", true)? {
        return Ok(());
    }

    let static_env = state
        .roots
        .src_root
        .join("test/std/input.output/filesystems/Inputs/static_test_env");
    let static_env = canonical_dir("libcxx_src_root", &static_env)?;
    state.flags.push(
        FlagClass::Compile,
        format!("-DLIBCXX_FILESYSTEM_STATIC_TEST_ROOT=\"{}\"", static_env.display()),
    );

    let dynamic_env = state.roots.exec_root.join("filesystem/Output/dynamic_env");
    fs::create_dir_all(&dynamic_env).map_err(|source| ResolveError::Io {
        path: dynamic_env.clone(),
        source,
    })?;
    let dynamic_env = canonical_dir("test_exec_root", &dynamic_env)?;
    let dynamic = dynamic_env.display().to_string();
    state.flags.push(
        FlagClass::Compile,
        format!("-DLIBCXX_FILESYSTEM_DYNAMIC_TEST_ROOT=\"{dynamic}\""),
    );
    state
        .exec_env
        .insert("LIBCXX_FILESYSTEM_DYNAMIC_TEST_ROOT".into(), dynamic);

    let helper = state.roots.support_dir().join("filesystem_dynamic_test_helper.py");
    if !helper.is_file() {
        return Err(ResolveError::MissingPath {
            param: "libcxx_src_root".into(),
            path: helper,
            expected: "file",
        });
    }
    let python = state.params.get_or("python_executable", "python3").to_string();
    state.flags.push(
        FlagClass::Compile,
        format!("-DLIBCXX_FILESYSTEM_DYNAMIC_TEST_HELPER=\"{python} {}\"", helper.display()),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::*;
    use cxxconf_core::Parameters;

    #[test]
    fn sandbox_is_created_and_exported() {
        let src = source_tree();
        let mut state = gcc_state(Parameters::new(), src.path());
        configure_filesystem(&mut state).unwrap();

        let root = fs::canonicalize(src.path()).unwrap();
        let dynamic = root.join("test/filesystem/Output/dynamic_env");
        assert!(dynamic.is_dir());
        assert_eq!(
            state.exec_env["LIBCXX_FILESYSTEM_DYNAMIC_TEST_ROOT"],
            dynamic.display().to_string()
        );
        assert_eq!(state.flags.compile.len(), 3);
        assert!(state.flags.compile[0].contains("static_test_env"));
        assert!(state.flags.compile[2].starts_with("-DLIBCXX_FILESYSTEM_DYNAMIC_TEST_HELPER=\"python3 "));
    }

    #[test]
    fn disabled_adds_nothing() {
        let src = source_tree();
        let params = Parameters::new().with_param("enable_filesystem", "false");
        let mut state = gcc_state(params, src.path());
        configure_filesystem(&mut state).unwrap();
        assert!(state.flags.compile.is_empty());
        assert!(state.exec_env.is_empty());
    }

    #[test]
    fn missing_fixture_tree_is_fatal() {
        let src = tempfile::tempdir().unwrap();
        let mut state = gcc_state(Parameters::new(), src.path());
        assert!(matches!(
            configure_filesystem(&mut state),
            Err(ResolveError::MissingPath { .. })
        ));
    }
}
