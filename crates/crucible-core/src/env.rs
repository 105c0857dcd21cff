//! Reified build environment.
//!
//! The compiler/linker flags and the parallelism setting are captured once
//! into an immutable [`BuildEnv`] and applied explicitly to every
//! subprocess, instead of being mutated process-wide.

use std::process::Command;

/// Immutable snapshot of the build environment.
///
/// Toolchain-internal parallelism is always disabled: `MAKEFLAGS` is
/// cleared on every invocation so a host-level `-j` never leaks into the
/// build.
#[derive(Debug, Clone, Default)]
pub struct BuildEnv {
    /// Preprocessor flags, verbatim from the invoking environment.
    pub cppflags: String,
    /// Compiler flags, verbatim from the invoking environment.
    pub cflags: String,
    /// Linker flags, verbatim from the invoking environment.
    pub ldflags: String,
}

impl BuildEnv {
    /// Capture `CPPFLAGS`, `CFLAGS` and `LDFLAGS` from the invoking
    /// environment. Missing variables become empty strings.
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).unwrap_or_default();
        Self {
            cppflags: var("CPPFLAGS"),
            cflags: var("CFLAGS"),
            ldflags: var("LDFLAGS"),
        }
    }

    /// The three flag sets split into individual configure arguments, in
    /// CPPFLAGS, CFLAGS, LDFLAGS order.
    pub fn flag_args(&self) -> Vec<String> {
        [&self.cppflags, &self.cflags, &self.ldflags]
            .iter()
            .flat_map(|s| s.split_whitespace())
            .map(str::to_string)
            .collect()
    }

    /// Apply this environment to a subprocess.
    pub fn apply(&self, cmd: &mut Command) {
        cmd.env("MAKEFLAGS", "");
        if !self.cppflags.is_empty() {
            cmd.env("CPPFLAGS", &self.cppflags);
        }
        if !self.cflags.is_empty() {
            cmd.env("CFLAGS", &self.cflags);
        }
        if !self.ldflags.is_empty() {
            cmd.env("LDFLAGS", &self.ldflags);
        }
    }
}
