//! Subcommand implementations.

pub mod bootstrap;
pub mod build;
pub mod caveats;
pub mod check;

use std::path::PathBuf;

use crucible_core::InstallPaths;

use crate::config::Settings;

/// Resolve the install layout from CLI flags, then crucible.toml, then
/// the built-in default prefix.
pub(crate) fn resolve_paths(
    prefix: Option<PathBuf>,
    openssldir: Option<PathBuf>,
    settings: &Settings,
) -> InstallPaths {
    let prefix = prefix
        .or_else(|| settings.prefix.clone())
        .unwrap_or_else(crate::default_prefix);
    let openssldir = openssldir.or_else(|| settings.openssldir.clone());
    InstallPaths::new(prefix, openssldir)
}
