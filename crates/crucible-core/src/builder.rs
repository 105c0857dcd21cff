//! Build orchestration: one isolated build pass per target architecture.
//!
//! Each architecture gets its own copy of the source tree, so no build
//! directory is ever reused or cleaned between passes and nothing can leak
//! from one architecture's objects into another's. The per-architecture
//! tree doubles as the staging directory handed to the merger.

use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config;
use crate::env::BuildEnv;
use crate::exec::{self, Toolchain};
use crate::fsutil;
use crate::paths::InstallPaths;
use crate::platform::{Arch, Capabilities};

/// Version suffix baked into OpenSSL 1.0.x shared library names.
pub const SHLIB_VERSION: &str = "1.0.0";

/// The two libraries every build produces.
pub const LIB_NAMES: [&str; 2] = ["libcrypto", "libssl"];

/// One architecture's completed build tree.
///
/// For universal builds this is the staging directory the merger reads
/// from; it is discarded once merging is done.
#[derive(Debug)]
pub struct StagedBuild {
    arch: Arch,
    root: PathBuf,
}

impl StagedBuild {
    /// A staged build rooted at `root` for `arch`.
    pub fn new(arch: Arch, root: PathBuf) -> Self {
        Self { arch, root }
    }

    /// The architecture this tree was built for.
    pub fn arch(&self) -> Arch {
        self.arch
    }

    /// Root of the build tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The generated configuration header for this architecture.
    pub fn conf_header(&self) -> PathBuf {
        self.root.join("include/openssl/opensslconf.h")
    }

    /// A versioned shared library (e.g. `libcrypto.1.0.0.dylib`).
    pub fn shared_lib(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{SHLIB_VERSION}.dylib"))
    }

    /// A static library (e.g. `libssl.a`).
    pub fn static_lib(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.a"))
    }

    /// The command-line executable built under `apps/`.
    pub fn app(&self) -> PathBuf {
        self.root.join("apps/openssl")
    }

    /// Directory holding the dynamically loaded engine plugins.
    pub fn engines_dir(&self) -> PathBuf {
        self.root.join("engines")
    }
}

/// Options controlling one pipeline run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Architectures to build, in order. More than one makes the build
    /// universal.
    pub archs: Vec<Arch>,
    /// Run the toolchain's test target after compiling each architecture.
    pub with_tests: bool,
}

impl BuildOptions {
    /// Whether this run targets more than one architecture.
    pub fn universal(&self) -> bool {
        self.archs.len() > 1
    }
}

/// Drives the external toolchain through configure / depend / build / test
/// for each requested architecture, then installs into the prefix.
#[derive(Debug)]
pub struct BuildOrchestrator<'a> {
    caps: Capabilities,
    toolchain: &'a Toolchain,
    env: &'a BuildEnv,
    paths: &'a InstallPaths,
}

impl<'a> BuildOrchestrator<'a> {
    /// An orchestrator over the given capabilities, toolchain, environment
    /// and install layout.
    pub fn new(
        caps: Capabilities,
        toolchain: &'a Toolchain,
        env: &'a BuildEnv,
        paths: &'a InstallPaths,
    ) -> Self {
        Self {
            caps,
            toolchain,
            env,
            paths,
        }
    }

    /// Build every requested architecture and install into the prefix.
    ///
    /// The source tree is copied to `<build_root>/build-<arch>` for each
    /// architecture and built there. Architectures build strictly in list
    /// order; a non-zero exit from any step aborts the whole run. The
    /// final `make install` runs from the last architecture's tree; on
    /// universal builds the merger overwrites every multi-architecture
    /// artifact afterwards.
    ///
    /// Returns the staged builds in architecture order.
    ///
    /// # Errors
    ///
    /// Returns an error if the sources cannot be staged or any toolchain
    /// step exits non-zero.
    pub fn build(
        &self,
        source: &Path,
        build_root: &Path,
        opts: &BuildOptions,
    ) -> Result<Vec<StagedBuild>> {
        anyhow::ensure!(!opts.archs.is_empty(), "no architectures requested");

        let mut staged = Vec::with_capacity(opts.archs.len());
        for &arch in &opts.archs {
            let dir = build_root.join(format!("build-{arch}"));
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            fsutil::copy_dir_all(source, &dir)
                .with_context(|| format!("Failed to stage sources for {arch}"))?;
            if self.caps.zlib_shim {
                patch_zlib_load_path(&dir)?;
            }
            self.build_one(arch, &dir, opts)?;
            staged.push(StagedBuild::new(arch, dir));
        }

        if let Some(last) = staged.last() {
            self.install(last.root())?;
        }
        Ok(staged)
    }

    /// Configure, generate dependencies, compile, and optionally test one
    /// architecture inside `dir`.
    fn build_one(&self, arch: Arch, dir: &Path, opts: &BuildOptions) -> Result<()> {
        tracing::info!(%arch, dir = %dir.display(), "configuring");
        let mut configure = vec!["./Configure".to_string()];
        configure.extend(config::configure_args(self.caps, self.paths, self.env, arch));
        exec::run(self.command(&self.toolchain.perl, &configure, dir))?;

        tracing::info!(%arch, "generating dependencies");
        exec::run(self.command(&self.toolchain.make, ["depend"], dir))?;

        tracing::info!(%arch, "compiling");
        exec::run(self.command::<[&str; 0], &str>(&self.toolchain.make, [], dir))?;

        if opts.with_tests {
            tracing::info!(%arch, "testing");
            exec::run(self.command(&self.toolchain.make, ["test"], dir))?;
        }
        Ok(())
    }

    /// `make install` with the manual pages redirected into the prefix.
    fn install(&self, dir: &Path) -> Result<()> {
        tracing::info!("installing into {}", self.paths.prefix().display());
        let mandir = format!("MANDIR={}", self.paths.man().display());
        exec::run(self.command(
            &self.toolchain.make,
            ["install", mandir.as_str(), "MANSUFFIX=ssl"],
            dir,
        ))?;
        Ok(())
    }

    fn command<I, S>(&self, program: &Path, args: I, cwd: &Path) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(cwd);
        self.env.apply(&mut cmd);
        cmd
    }
}

/// Load zlib from an explicit path instead of relying on dyld's fallback
/// path, which is empty in a SIP context. Unnecessary once the build
/// disables TLS compression entirely (`no-comp`).
fn patch_zlib_load_path(tree: &Path) -> Result<()> {
    let file = tree.join("crypto/comp/c_zlib.c");
    let source = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let from = r#"zlib_dso = DSO_load(NULL, "z", NULL, 0);"#;
    let to = r#"zlib_dso = DSO_load(NULL, "/usr/lib/libz.dylib", NULL, DSO_FLAG_NO_NAME_TRANSLATION);"#;
    anyhow::ensure!(
        source.contains(from),
        "zlib load site not found in {}",
        file.display()
    );

    std::fs::write(&file, source.replace(from, to))
        .with_context(|| format!("Failed to rewrite {}", file.display()))?;
    Ok(())
}
