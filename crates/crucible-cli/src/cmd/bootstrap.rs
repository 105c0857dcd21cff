//! Bootstrap command: re-run the certificate bootstrap alone.

use anyhow::{Context, Result, ensure};
use std::path::PathBuf;

use crucible_core::certs::CertificateBootstrapper;
use crucible_core::exec::Toolchain;
use crucible_core::platform::{Capabilities, Os};

use crate::config::Settings;

/// Bootstrap the trust store against an already-installed build.
pub fn bootstrap(prefix: Option<PathBuf>, openssldir: Option<PathBuf>) -> Result<()> {
    let settings = Settings::load(&std::env::current_dir()?)?;
    let caps = Capabilities::probe(Os::current());
    ensure!(
        caps.native_keychain,
        "this platform has no native keychain to bootstrap from"
    );
    let paths = super::resolve_paths(prefix, openssldir, &settings);
    ensure!(
        paths.openssl_bin().exists(),
        "no built binary at {}; run `crucible build` first",
        paths.openssl_bin().display()
    );

    let toolchain = Toolchain::locate(caps)?;
    let security = settings
        .tools
        .security
        .clone()
        .or(toolchain.security)
        .context("keychain platform without a security command")?;

    let mut bootstrapper = CertificateBootstrapper::new(security, &paths);
    if let Some(keychains) = settings.keychains {
        bootstrapper = bootstrapper.with_keychains(keychains);
    }
    let kept = bootstrapper.bootstrap()?;
    println!(
        "Wrote {kept} certificates to {}",
        paths.cert_pem().display()
    );
    Ok(())
}
