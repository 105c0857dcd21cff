//! Trust-store bootstrap from the host keychain.
//!
//! Applicable only on platforms whose trust anchors live in a native OS
//! keychain. The keychain dump is split by a strict streaming parser over
//! the PEM delimiter grammar; each certificate is validated by piping its
//! text into the freshly built binary's expiry check; the survivors are
//! persisted atomically. Certificates failing the check are expected and
//! excluded silently; a failure to run the dump or the check itself is
//! fatal for this step only and never unwinds the installed build.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::Error;
use crate::exec;
use crate::fsutil;
use crate::paths::InstallPaths;

/// System keychains queried for trust anchors.
pub const SYSTEM_KEYCHAINS: [&str; 2] = [
    "/Library/Keychains/System.keychain",
    "/System/Library/Keychains/SystemRootCertificates.keychain",
];

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// One PEM-encoded certificate, verbatim from a keychain dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate(String);

impl Certificate {
    /// The PEM text including both envelope markers, without a trailing
    /// newline.
    pub fn pem(&self) -> &str {
        &self.0
    }
}

/// Split a keychain dump into individual PEM certificate blocks.
///
/// Streams over the `BEGIN`/`END` delimiter grammar: text outside blocks
/// is ignored, but a nested begin marker, a stray end marker, or a block
/// still open at end of input is rejected rather than silently dropped.
/// Certificates are returned in extraction order.
///
/// # Errors
///
/// Returns [`Error::MalformedPem`] for a nested begin marker, a stray end
/// marker, or an unterminated block.
pub fn parse_pem_blocks(dump: &str) -> Result<Vec<Certificate>, Error> {
    let mut certs = Vec::new();
    let mut opened_at: Option<usize> = None;
    let mut lines: Vec<&str> = Vec::new();

    for (idx, raw) in dump.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();
        if line == PEM_BEGIN {
            if opened_at.is_some() {
                return Err(Error::MalformedPem {
                    line: line_no,
                    reason: "begin marker inside an open certificate block",
                });
            }
            opened_at = Some(line_no);
            lines.clear();
            lines.push(PEM_BEGIN);
        } else if line == PEM_END {
            if opened_at.is_none() {
                return Err(Error::MalformedPem {
                    line: line_no,
                    reason: "end marker without a matching begin",
                });
            }
            lines.push(PEM_END);
            certs.push(Certificate(lines.join("\n")));
            opened_at = None;
        } else if opened_at.is_some() {
            lines.push(line);
        }
    }

    if let Some(line) = opened_at {
        return Err(Error::MalformedPem {
            line,
            reason: "unterminated certificate block",
        });
    }
    Ok(certs)
}

/// Persist the trust store: PEM blocks joined by a blank line, written
/// atomically after the directory is created.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the atomic
/// write fails.
pub fn write_trust_store(path: &Path, certs: &[Certificate]) -> Result<()> {
    let body = certs
        .iter()
        .map(Certificate::pem)
        .collect::<Vec<_>>()
        .join("\n\n");
    fsutil::atomic_write(path, body.as_bytes())
}

/// Install a prebuilt CA bundle as the trust store.
///
/// The alternative path for platforms without a native keychain. Kept
/// deliberately inactive: nothing in the standard pipeline calls it, and
/// the conditions under which it should are an open question upstream.
///
/// # Errors
///
/// Returns an error if the bundle cannot be read or the atomic write
/// fails.
pub fn install_bundle(bundle: &Path, trust_store: &Path) -> Result<()> {
    let body = std::fs::read(bundle)
        .with_context(|| format!("Failed to read CA bundle {}", bundle.display()))?;
    fsutil::atomic_write(trust_store, &body)
}

/// Queries the OS keychains, validates each certificate with the built
/// binary, and persists the surviving set.
#[derive(Debug)]
pub struct CertificateBootstrapper {
    security: PathBuf,
    openssl: PathBuf,
    keychains: Vec<PathBuf>,
    trust_store: PathBuf,
}

impl CertificateBootstrapper {
    /// A bootstrapper over the standard system keychains, validating with
    /// the binary installed under `paths` and writing its trust store.
    pub fn new(security: PathBuf, paths: &InstallPaths) -> Self {
        Self {
            security,
            openssl: paths.openssl_bin(),
            keychains: SYSTEM_KEYCHAINS.iter().map(PathBuf::from).collect(),
            trust_store: paths.cert_pem(),
        }
    }

    /// Replace the queried keychain set (tests, non-standard hosts).
    pub fn with_keychains(mut self, keychains: Vec<PathBuf>) -> Self {
        self.keychains = keychains;
        self
    }

    /// Run the full bootstrap: dump, parse, validate, persist.
    ///
    /// Returns how many certificates survived validation and were
    /// written. The trust store is written exactly once, atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the keychain query fails, the dump is
    /// malformed, the validating binary cannot be launched, or the trust
    /// store cannot be written. A certificate merely failing validation
    /// is not an error.
    pub fn bootstrap(&self) -> Result<usize> {
        let dump = self.query_keychains()?;
        let certs = parse_pem_blocks(&dump)?;
        tracing::info!(extracted = certs.len(), "validating keychain certificates");

        let mut valid = Vec::with_capacity(certs.len());
        for cert in certs {
            if self.check_expiry(&cert)? {
                valid.push(cert);
            } else {
                tracing::debug!("excluding certificate that failed the expiry check");
            }
        }

        write_trust_store(&self.trust_store, &valid)?;
        tracing::info!(
            kept = valid.len(),
            path = %self.trust_store.display(),
            "trust store written"
        );
        Ok(valid.len())
    }

    /// Concatenated PEM dump of every certificate in the configured
    /// keychains.
    fn query_keychains(&self) -> Result<String, Error> {
        let mut cmd = Command::new(&self.security);
        cmd.args(["find-certificate", "-a", "-p"]);
        for keychain in &self.keychains {
            cmd.arg(keychain);
        }
        exec::run_capture(cmd).map_err(|err| match err {
            Error::Toolchain { command, status } => Error::Keychain { command, status },
            other => other,
        })
    }

    /// Exit-zero iff the built binary parses the certificate and it has
    /// not expired as of now.
    fn check_expiry(&self, cert: &Certificate) -> Result<bool, Error> {
        let mut cmd = Command::new(&self.openssl);
        cmd.args(["x509", "-inform", "pem", "-checkend", "0", "-noout"]);
        exec::run_with_stdin_status(cmd, cert.pem())
    }
}
