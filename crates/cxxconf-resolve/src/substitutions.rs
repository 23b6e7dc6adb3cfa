//! Placeholder expansions handed to the test runner.

use cxxconf_core::{render_flags, CompilerVendor};
use indexmap::IndexMap;
use serde::Serialize;

use crate::state::ResolutionState;

const VERIFY_FLAGS: [&str; 5] = [
    "-Xclang",
    "-verify",
    "-Xclang",
    "-verify-ignore-unexpected=note",
    "-ferror-limit=1024",
];

fn quote(word: &str) -> String {
    render_flags(&[word])
}

/// Ordered placeholder to expansion mapping.
///
/// Earlier entries win when a runner expands placeholders sharing a
/// prefix, so insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubstitutionTable {
    entries: IndexMap<String, String>,
}

impl SubstitutionTable {
    /// Assemble the table from fully resolved state. Must run after every
    /// stage that can still add flags.
    pub fn build(state: &ResolutionState) -> Self {
        let mut table = Self::default();
        let identity = state.cxx.identity();

        let mut cxx = String::new();
        if state.use_ccache {
            cxx.push_str("ccache ");
        }
        cxx.push_str(&quote(&identity.path.display().to_string()));
        if let Some(first) = identity.first_arg.as_deref() {
            cxx.push(' ');
            cxx.push_str(&quote(first));
        }
        table.insert("%cxx", &cxx);
        table.insert("%libcxx_src_root", state.roots.src_root.display().to_string());

        let flags = render_flags(&state.flags.general);
        let compile = render_flags(&state.flags.effective_compile_flags());
        let link = render_flags(&state.flags.link);
        let all = format!("{flags} {compile} {link}");
        table.insert("%flags", &flags);
        table.insert("%compile_flags", &compile);
        table.insert("%link_flags", &link);
        table.insert("%all_flags", &all);
        if state.use_clang_verify {
            table.insert("%verify", format!(" {} ", VERIFY_FLAGS.join(" ")));
        }

        let compile_str = format!("{cxx} -o %t.o %s -c {flags} {compile}");
        let link_str = format!("{cxx} -o %t.exe %t.o {flags} {link}");
        let build_str = format!("{cxx} -o %t.exe %s {all}");
        if state.flags.use_modules() {
            table.insert("%compile_module", &compile_str);
            table.insert("%build_module", &build_str);
        } else if !state.flags.modules.is_empty() {
            let modules = format!("{} ", render_flags(&state.flags.modules));
            table.insert("%compile_module", format!("{compile_str} {modules}"));
            table.insert("%build_module", format!("{build_str} {modules}"));
        }
        table.insert("%compile", compile_str);
        table.insert("%link", link_str);
        table.insert("%build", build_str);
        table.insert("%run", "%t.exe");

        let python = state.params.get_or("python_executable", "python3");
        let not_py = state.roots.src_root.join("utils").join("not.py");
        table.insert(
            "not ",
            format!("{} {} ", quote(python), quote(&not_py.display().to_string())),
        );
        if let Some(gdb) = state.params.get_non_empty("libcxx_gdb") {
            table.insert("%libcxx_gdb", gdb);
        }

        let nvhpc = state.is_vendor(CompilerVendor::Nvhpc);
        table.insert("%syntaxonly", if nvhpc { "" } else { "-fsyntax-only" });
        table.insert("%noexceptions", if nvhpc { "" } else { "-fno-exceptions" });
        table
    }

    fn insert(&mut self, placeholder: &str, expansion: impl Into<String>) {
        self.entries.insert(placeholder.to_string(), expansion.into());
    }

    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.entries.get(placeholder).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
