//! Universal artifact merging.
//!
//! Only runs when more than one architecture was built. Binaries are
//! fused with one external `lipo -create` invocation per artifact name;
//! the generated configuration header is not fused but concatenated from
//! per-architecture blocks, each wrapped in that architecture's
//! preprocessor guard, and written atomically.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::builder::{LIB_NAMES, SHLIB_VERSION, StagedBuild};
use crate::exec::{self, Toolchain};
use crate::fsutil;
use crate::paths::InstallPaths;

/// Fuses per-architecture staged artifacts into universal binaries at the
/// final install locations.
#[derive(Debug)]
pub struct BinaryMerger<'a> {
    toolchain: &'a Toolchain,
    paths: &'a InstallPaths,
}

impl<'a> BinaryMerger<'a> {
    /// A merger writing into `paths` using the fusion command from
    /// `toolchain`.
    pub fn new(toolchain: &'a Toolchain, paths: &'a InstallPaths) -> Self {
        Self { toolchain, paths }
    }

    /// Merge all staged builds into the install prefix.
    ///
    /// Requires at least two staged builds; a single-architecture build
    /// installs its outputs directly and never reaches this step. An
    /// artifact missing from any staging directory makes the fusion
    /// command exit non-zero, which aborts the install.
    ///
    /// # Errors
    ///
    /// Returns an error if any fusion invocation fails, a staged header
    /// cannot be read, or the merged header cannot be written.
    pub fn merge(&self, staged: &[StagedBuild]) -> Result<()> {
        anyhow::ensure!(
            staged.len() > 1,
            "universal merge requires more than one staged build"
        );

        std::fs::create_dir_all(self.paths.lib())
            .with_context(|| format!("Failed to create {}", self.paths.lib().display()))?;
        for name in LIB_NAMES {
            let shared = format!("{name}.{SHLIB_VERSION}.dylib");
            self.fuse(
                staged.iter().map(|s| s.shared_lib(name)),
                &self.paths.lib().join(shared),
            )?;
            self.fuse(
                staged.iter().map(|s| s.static_lib(name)),
                &self.paths.lib().join(format!("{name}.a")),
            )?;
        }

        self.merge_engines(staged)?;

        std::fs::create_dir_all(self.paths.bin())
            .with_context(|| format!("Failed to create {}", self.paths.bin().display()))?;
        self.fuse(staged.iter().map(StagedBuild::app), &self.paths.openssl_bin())?;

        self.write_header(staged)
    }

    /// One fusion invocation: N same-named inputs, one universal output.
    fn fuse(&self, inputs: impl IntoIterator<Item = PathBuf>, output: &Path) -> Result<()> {
        let lipo = self
            .toolchain
            .lipo
            .as_deref()
            .context("no fusion command available; universal builds need lipo")?;
        let mut cmd = Command::new(lipo);
        cmd.arg("-create");
        for input in inputs {
            cmd.arg(input);
        }
        cmd.arg("-output").arg(output);
        exec::run(cmd)?;
        Ok(())
    }

    /// Fuse every engine plugin found under the first staging directory,
    /// matched by file name across all staging directories.
    fn merge_engines(&self, staged: &[StagedBuild]) -> Result<()> {
        let first = &staged[0];
        let engines = first.engines_dir();
        if !engines.is_dir() {
            return Ok(());
        }

        let out_dir = self.paths.engines();
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;

        for entry in walkdir::WalkDir::new(&engines)
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("dylib") {
                continue;
            }
            let Ok(rel) = path.strip_prefix(&engines) else {
                continue;
            };
            let Some(name) = path.file_name() else {
                continue;
            };
            let rel = rel.to_path_buf();
            self.fuse(
                staged.iter().map(|s| s.engines_dir().join(&rel)),
                &out_dir.join(name),
            )?;
        }
        Ok(())
    }

    /// Build the merged configuration header: each architecture's header
    /// body wrapped in its `#ifdef` guard, concatenated in architecture
    /// order, written atomically so no reader ever sees a truncated
    /// header.
    fn write_header(&self, staged: &[StagedBuild]) -> Result<()> {
        let mut blocks = Vec::with_capacity(staged.len());
        for build in staged {
            let header = build.conf_header();
            let body = std::fs::read_to_string(&header)
                .with_context(|| format!("Failed to read {}", header.display()))?;
            blocks.push(format!("#ifdef {}\n{body}\n#endif\n", build.arch().guard()));
        }
        fsutil::atomic_write(&self.paths.conf_header(), blocks.join("\n").as_bytes())
    }
}
