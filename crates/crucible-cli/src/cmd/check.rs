//! Check command: digest regression against the installed binary.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::Settings;

/// Verify the installed binary produces the known SHA-256 digest.
pub fn check(prefix: Option<PathBuf>, openssldir: Option<PathBuf>) -> Result<()> {
    let settings = Settings::load(&std::env::current_dir()?)?;
    let paths = super::resolve_paths(prefix, openssldir, &settings);

    let work = tempfile::tempdir().context("Failed to create a scratch directory")?;
    crucible_core::check::run(&paths, work.path())?;
    println!("OK: {} checks out", paths.openssl_bin().display());
    Ok(())
}
