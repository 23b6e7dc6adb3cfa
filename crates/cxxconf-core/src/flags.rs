//! Ordered compiler flag lists.
//!
//! Flags are plain command-line tokens. Order is significant (a later
//! `-D` wins, `-Xcompiler` must sit directly before the flag it wraps),
//! so every list is append-only and duplicates are only avoided when
//! explicitly requested with [`FlagAccumulator::push_unique`].

use std::borrow::Cow;

use serde::Serialize;

/// The class a flag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagClass {
    /// Passed to every compile and link command.
    General,
    /// Passed only when compiling.
    Compile,
    /// Passed only when linking.
    Link,
    /// Passed when compiling, if warnings are enabled.
    Warning,
    /// Passed when building with modules.
    Modules,
}

/// Anything that can tell whether the compiler accepts a set of flags.
pub trait FlagSupport {
    /// Trial-compile with `candidate` appended to `baseline`.
    ///
    /// Failure is an expected answer, never an error.
    fn supports_flags(&mut self, baseline: &[String], candidate: &[String]) -> bool;
}

/// Holds the flag lists accumulated by the resolution stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlagAccumulator {
    pub general: Vec<String>,
    pub compile: Vec<String>,
    pub link: Vec<String>,
    pub warning: Vec<String>,
    pub modules: Vec<String>,
    use_warnings: bool,
    use_modules: bool,
}

impl FlagAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self, class: FlagClass) -> &[String] {
        match class {
            FlagClass::General => &self.general,
            FlagClass::Compile => &self.compile,
            FlagClass::Link => &self.link,
            FlagClass::Warning => &self.warning,
            FlagClass::Modules => &self.modules,
        }
    }

    fn list_mut(&mut self, class: FlagClass) -> &mut Vec<String> {
        match class {
            FlagClass::General => &mut self.general,
            FlagClass::Compile => &mut self.compile,
            FlagClass::Link => &mut self.link,
            FlagClass::Warning => &mut self.warning,
            FlagClass::Modules => &mut self.modules,
        }
    }

    /// Append a flag.
    pub fn push(&mut self, class: FlagClass, flag: impl Into<String>) {
        self.list_mut(class).push(flag.into());
    }

    /// Append several flags, keeping their order.
    pub fn extend<I, S>(&mut self, class: FlagClass, flags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.list_mut(class).extend(flags.into_iter().map(Into::into));
    }

    /// Append a flag unless the identical text is already in the list.
    ///
    /// Returns whether the flag was added.
    pub fn push_unique(&mut self, class: FlagClass, flag: impl Into<String>) -> bool {
        let flag = flag.into();
        let list = self.list_mut(class);
        if list.contains(&flag) {
            false
        } else {
            list.push(flag);
            true
        }
    }

    pub fn contains(&self, class: FlagClass, flag: &str) -> bool {
        self.list(class).iter().any(|f| f == flag)
    }

    /// Append `flags` only if `probe` confirms the compiler accepts them
    /// on top of the current baseline. Unsupported flags are dropped silently.
    pub fn push_if_supported<P>(&mut self, class: FlagClass, flags: &[&str], probe: &mut P) -> bool
    where
        P: FlagSupport + ?Sized,
    {
        let candidate: Vec<String> = flags.iter().map(|f| f.to_string()).collect();
        if probe.supports_flags(&self.baseline(), &candidate) {
            self.extend(class, candidate);
            true
        } else {
            false
        }
    }

    /// Toggle whether warning flags join the effective compile flags.
    pub fn set_use_warnings(&mut self, enabled: bool) {
        self.use_warnings = enabled;
    }

    pub fn use_warnings(&self) -> bool {
        self.use_warnings
    }

    /// Build every test with the module flags.
    pub fn enable_modules(&mut self) {
        self.use_modules = true;
    }

    pub fn use_modules(&self) -> bool {
        self.use_modules
    }

    /// Compile-only flags plus warning flags when warnings are enabled.
    pub fn effective_compile_flags(&self) -> Vec<String> {
        let mut flags = self.compile.clone();
        if self.use_warnings {
            flags.extend(self.warning.iter().cloned());
        }
        flags
    }

    /// The flags a trial compilation runs with.
    pub fn baseline(&self) -> Vec<String> {
        let mut flags = self.general.clone();
        if self.use_modules {
            flags.extend(self.modules.iter().cloned());
        }
        flags.extend(self.effective_compile_flags());
        flags
    }
}

/// Render flags as one shell string, quoting so that argument boundaries survive.
pub fn render_flags<S: AsRef<str>>(flags: &[S]) -> String {
    flags
        .iter()
        .map(|f| quote(f.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Characters a POSIX shell word may carry without quoting.
fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c)
}

fn quote(flag: &str) -> Cow<'_, str> {
    if !flag.is_empty() && flag.chars().all(is_shell_safe) {
        return Cow::Borrowed(flag);
    }
    match shlex::try_quote(flag) {
        Ok(quoted) => quoted,
        // Only interior NUL bytes are rejected; they cannot reach a real
        // command line, so strip them and quote what is left.
        Err(_) => Cow::Owned(format!("'{}'", flag.replace('\0', "").replace('\'', r"'\''"))),
    }
}
