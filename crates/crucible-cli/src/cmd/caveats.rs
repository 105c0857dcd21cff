//! Caveats command: print the post-install message.

use anyhow::Result;
use std::path::PathBuf;

use crate::config::Settings;

/// Print the post-install message for the resolved layout.
pub fn caveats(prefix: Option<PathBuf>, openssldir: Option<PathBuf>) -> Result<()> {
    let settings = Settings::load(&std::env::current_dir()?)?;
    let paths = super::resolve_paths(prefix, openssldir, &settings);
    println!("{}", crate::caveats(&paths));
    Ok(())
}
