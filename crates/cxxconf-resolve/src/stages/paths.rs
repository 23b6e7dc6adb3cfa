//! Root directories and standard-library selection.

use std::path::{Path, PathBuf};

use cxxconf_core::{Parameters, ResolveError, Result};

use crate::state::{ResolutionState, StdLib, SystemCxxLib};

/// Interpret `use_system_cxx_lib`: `true`, `false`, or a library directory.
pub fn system_cxx_lib(params: &Parameters) -> Result<SystemCxxLib> {
    match params.get("use_system_cxx_lib") {
        None | Some("") | Some("false") => Ok(SystemCxxLib::Local),
        Some("true") => Ok(SystemCxxLib::Default),
        Some(dir) => {
            let path = Path::new(dir);
            if !path.is_dir() {
                return Err(ResolveError::MissingPath {
                    param: "use_system_cxx_lib".into(),
                    path: path.to_path_buf(),
                    expected: "directory",
                });
            }
            let absolute = std::path::absolute(path).map_err(|source| ResolveError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(SystemCxxLib::Dir(absolute))
        }
    }
}

fn param_path(state: &ResolutionState, name: &str) -> Option<PathBuf> {
    state.params.get_non_empty(name).map(PathBuf::from)
}

/// Resolve the source root, the build root and the scratch root.
pub fn configure_roots(state: &mut ResolutionState) -> Result<()> {
    let src_root = match param_path(state, "libcxx_src_root") {
        Some(root) => root,
        None => param_path(state, "test_source_root")
            .and_then(|t| t.parent().map(Path::to_path_buf))
            .ok_or_else(|| ResolveError::MissingParameter {
                param: "libcxx_src_root".into(),
                hint: "or test_source_root".into(),
            })?,
    };
    if !src_root.is_dir() {
        return Err(ResolveError::MissingPath {
            param: "libcxx_src_root".into(),
            path: src_root,
            expected: "directory",
        });
    }

    let obj_root = match param_path(state, "libcxx_obj_root") {
        Some(root) => Some(root),
        None => param_path(state, "project_obj_root").map(|project| {
            let candidates = [
                project.join("libcxx"),
                project.join("projects").join("libcxx"),
                project.join("runtimes").join("libcxx"),
            ];
            candidates
                .into_iter()
                .find(|c| c.is_dir())
                .unwrap_or(project)
        }),
    };

    let exec_root = match param_path(state, "test_exec_root") {
        Some(root) => root,
        None => obj_root.as_ref().unwrap_or(&src_root).join("test"),
    };

    state.roots.src_root = src_root;
    state.roots.obj_root = obj_root;
    state.roots.exec_root = exec_root;
    Ok(())
}

/// Select the standard library under test.
pub fn configure_stdlib(state: &mut ResolutionState) -> Result<()> {
    let name = state.params.get_or("cxx_stdlib_under_test", "libc++").to_string();
    let stdlib = StdLib::parse(&name)?;
    state.features.add(stdlib.as_str());
    if stdlib == StdLib::LibStdCxx && state.params.get("enable_experimental").is_none() {
        // libstdc++ ships its experimental and filesystem bits separately.
        state.params.set_site("enable_experimental", "true");
    }
    state.stdlib = stdlib;
    Ok(())
}

/// Shared or static linking, and whether the library was built for debugging.
pub fn configure_build_mode(state: &mut ResolutionState) -> Result<()> {
    state.link_shared = state.params.get_bool("enable_shared", true)?;
    state.debug_build = state.params.get_bool("debug_build", false)?;
    Ok(())
}

/// Library directories, defaulting to the build root.
pub fn configure_library_roots(state: &mut ResolutionState) {
    let library_root = param_path(state, "cxx_library_root").or_else(|| state.roots.obj_root.clone());
    let runtime_root = param_path(state, "cxx_runtime_root").or_else(|| library_root.clone());
    state.roots.library_root = library_root;
    state.roots.runtime_root = runtime_root;
    state.roots.abi_library_root = param_path(state, "abi_library_path");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::*;
    use std::fs;

    #[test]
    fn system_lib_vocabulary() {
        let p = |v: &str| Parameters::new().with_param("use_system_cxx_lib", v);
        assert_eq!(system_cxx_lib(&Parameters::new()).unwrap(), SystemCxxLib::Local);
        assert_eq!(system_cxx_lib(&p("false")).unwrap(), SystemCxxLib::Local);
        assert_eq!(system_cxx_lib(&p("true")).unwrap(), SystemCxxLib::Default);
        let dir = tempfile::tempdir().unwrap();
        let given = dir.path().display().to_string();
        assert!(matches!(system_cxx_lib(&p(&given)).unwrap(), SystemCxxLib::Dir(_)));
        assert!(matches!(
            system_cxx_lib(&p("/nonexistent/cxxconf/lib")),
            Err(ResolveError::MissingPath { .. })
        ));
    }

    #[test]
    fn obj_root_candidates_in_order() {
        let src = source_tree();
        let project = tempfile::tempdir().unwrap();
        fs::create_dir_all(project.path().join("runtimes/libcxx")).unwrap();
        let params = Parameters::new()
            .with_param("libcxx_src_root", src.path().display().to_string())
            .with_param("project_obj_root", project.path().display().to_string());
        let mut state = gcc_state(params, src.path());
        configure_roots(&mut state).unwrap();
        configure_library_roots(&mut state);
        let expected = project.path().join("runtimes/libcxx");
        assert_eq!(state.roots.obj_root.as_deref(), Some(expected.as_path()));
        assert_eq!(state.roots.exec_root, expected.join("test"));
        assert_eq!(state.roots.runtime_root.as_deref(), Some(expected.as_path()));
    }

    #[test]
    fn src_root_from_test_source_root() {
        let src = source_tree();
        let params = Parameters::new().with_param("test_source_root", src.path().join("test").display().to_string());
        let mut state = gcc_state(params, src.path());
        configure_roots(&mut state).unwrap();
        assert_eq!(state.roots.src_root, src.path());
        assert_eq!(state.roots.exec_root, src.path().join("test"));
        assert!(state.roots.obj_root.is_none());
    }

    #[test]
    fn missing_src_root_is_fatal() {
        let src = source_tree();
        let mut state = gcc_state(Parameters::new(), src.path());
        assert!(matches!(
            configure_roots(&mut state),
            Err(ResolveError::MissingParameter { .. })
        ));
    }

    #[test]
    fn stdlib_selection() {
        let src = source_tree();
        let mut state = gcc_state(Parameters::new().with_param("cxx_stdlib_under_test", "libstdc++"), src.path());
        configure_stdlib(&mut state).unwrap();
        assert!(state.has_feature("libstdc++"));
        assert_eq!(state.params.get("enable_experimental"), Some("true"));

        let mut state = gcc_state(Parameters::new().with_param("cxx_stdlib_under_test", "libc++abi"), src.path());
        let err = configure_stdlib(&mut state).unwrap_err();
        assert_eq!(err.to_string(), "unsupported value for \"cxx_stdlib_under_test\": libc++abi");
    }
}
