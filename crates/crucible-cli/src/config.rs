//! Optional `crucible.toml` settings file.
//!
//! Command-line flags always win over file values; the file exists so a
//! provisioning setup can pin the source tree, install locations, and
//! tool overrides without repeating them on every invocation.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings parsed from a `crucible.toml` in the working directory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// OpenSSL source tree to build.
    pub source: Option<PathBuf>,
    /// Install prefix.
    pub prefix: Option<PathBuf>,
    /// Trust-store directory.
    pub openssldir: Option<PathBuf>,
    /// Keychains to query instead of the system defaults.
    pub keychains: Option<Vec<PathBuf>>,
    /// External command overrides.
    pub tools: Tools,
}

/// Overrides for the external commands the pipeline invokes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tools {
    /// Configure-script interpreter.
    pub perl: Option<PathBuf>,
    /// Build driver.
    pub make: Option<PathBuf>,
    /// Binary-fusion command.
    pub lipo: Option<PathBuf>,
    /// Keychain-dump command.
    pub security: Option<PathBuf>,
}

impl Settings {
    /// Load settings from `crucible.toml` in `dir`, or defaults when the
    /// file is absent.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join("crucible.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(&path).context("Failed to read crucible.toml")?;
        toml::from_str(&content).context("Failed to parse crucible.toml")
    }
}
