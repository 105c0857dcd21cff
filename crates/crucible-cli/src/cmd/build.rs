//! Build command: the full recipe.

use anyhow::{Context, Result, ensure};
use std::path::PathBuf;

use crucible_core::builder::{BuildOptions, BuildOrchestrator};
use crucible_core::certs::CertificateBootstrapper;
use crucible_core::env::BuildEnv;
use crucible_core::exec::Toolchain;
use crucible_core::merge::BinaryMerger;
use crucible_core::platform::{Arch, Capabilities, Os};

use crate::config::Settings;

/// Arguments for one build invocation, resolved from the CLI.
#[derive(Debug)]
pub struct BuildArgs {
    /// OpenSSL source tree.
    pub source: Option<PathBuf>,
    /// Install prefix.
    pub prefix: Option<PathBuf>,
    /// Trust-store directory.
    pub openssldir: Option<PathBuf>,
    /// Requested architectures, in build order.
    pub archs: Vec<String>,
    /// Build every supported architecture.
    pub universal: bool,
    /// Skip the toolchain's test target.
    pub skip_tests: bool,
}

/// Run the whole pipeline: build each architecture, install, merge
/// universal artifacts, bootstrap the trust store, print the caveats.
pub fn build(args: BuildArgs) -> Result<()> {
    let settings = Settings::load(&std::env::current_dir()?)?;
    let caps = Capabilities::probe(Os::current());
    let paths = super::resolve_paths(args.prefix.clone(), args.openssldir.clone(), &settings);

    let archs = resolve_archs(&args, caps)?;
    let source = args
        .source
        .or_else(|| settings.source.clone())
        .context("no source tree given (pass --source or set `source` in crucible.toml)")?;
    ensure!(
        source.join("Configure").exists(),
        "{} does not look like an OpenSSL source tree (no Configure script)",
        source.display()
    );

    let toolchain = toolchain_with_overrides(caps, &settings)?;
    let env = BuildEnv::from_env();
    let opts = BuildOptions {
        archs,
        with_tests: !args.skip_tests,
    };

    // Per-architecture build directories live in a scratch root that goes
    // away with this invocation.
    let build_root = tempfile::Builder::new()
        .prefix("crucible-build-")
        .tempdir()
        .context("Failed to create a scratch build directory")?;

    let orchestrator = BuildOrchestrator::new(caps, &toolchain, &env, &paths);
    let staged = orchestrator.build(&source, build_root.path(), &opts)?;

    if opts.universal() {
        tracing::info!("merging universal artifacts");
        BinaryMerger::new(&toolchain, &paths).merge(&staged)?;
    }

    if caps.native_keychain {
        let security = toolchain
            .security
            .clone()
            .context("keychain platform without a security command")?;
        let mut bootstrapper = CertificateBootstrapper::new(security, &paths);
        if let Some(keychains) = settings.keychains.clone() {
            bootstrapper = bootstrapper.with_keychains(keychains);
        }
        bootstrapper.bootstrap()?;
    } else {
        tracing::info!("no native keychain on this platform; skipping trust-store bootstrap");
    }

    println!("{}", crate::caveats(&paths));
    Ok(())
}

/// Architectures for this run: `--universal` means both supported ones,
/// explicit `--arch` flags are taken in order, and the default is the
/// host's 64-bit architecture.
fn resolve_archs(args: &BuildArgs, caps: Capabilities) -> Result<Vec<Arch>> {
    if args.universal {
        ensure!(
            caps.universal_binaries,
            "universal builds need a platform with a multi-architecture binary format"
        );
        return Ok(vec![Arch::X86_64, Arch::I386]);
    }
    if args.archs.is_empty() {
        return Ok(vec![Arch::host_64_bit()]);
    }
    let archs = args
        .archs
        .iter()
        .map(|raw| raw.parse().map_err(anyhow::Error::msg))
        .collect::<Result<Vec<Arch>>>()?;
    if archs.len() > 1 {
        ensure!(
            caps.universal_binaries,
            "multiple architectures need a platform with a multi-architecture binary format"
        );
    }
    Ok(archs)
}

/// The located toolchain with any crucible.toml overrides applied.
fn toolchain_with_overrides(caps: Capabilities, settings: &Settings) -> Result<Toolchain> {
    let mut toolchain = Toolchain::locate(caps)?;
    if let Some(perl) = settings.tools.perl.clone() {
        toolchain.perl = perl;
    }
    if let Some(make) = settings.tools.make.clone() {
        toolchain.make = make;
    }
    if let Some(lipo) = settings.tools.lipo.clone() {
        toolchain.lipo = Some(lipo);
    }
    if let Some(security) = settings.tools.security.clone() {
        toolchain.security = Some(security);
    }
    Ok(toolchain)
}
