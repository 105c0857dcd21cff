//! Post-install functional check of the built binary.
//!
//! Digests a fixed input through the installed binary and compares
//! against a known literal, a regression anchor for basic functional
//! correctness of the build output.

use anyhow::{Context, Result, ensure};
use std::path::Path;
use std::process::Command;

use crate::exec;
use crate::paths::InstallPaths;

/// Fixed input for the digest regression check.
pub const CHECK_INPUT: &str = "This is a test file";

/// SHA-256 of [`CHECK_INPUT`], as the installed binary must report it.
pub const EXPECTED_DIGEST: &str =
    "e2d0fe1585a63ec6009c8016ff8dda8b17719a637405a4e23c0ff81339148249";

/// Run the check inside `work_dir`.
///
/// Asserts the installed configuration file exists (the binary gets moody
/// without it), then digests [`CHECK_INPUT`] with
/// `openssl dgst -sha256 -out checksum.txt testfile.txt` and compares the
/// reported digest to [`EXPECTED_DIGEST`].
///
/// # Errors
///
/// Returns an error if the configuration file is missing, the binary
/// cannot be invoked, or the reported digest does not match.
pub fn run(paths: &InstallPaths, work_dir: &Path) -> Result<()> {
    ensure!(
        paths.openssl_cnf().exists(),
        "missing {} (OpenSSL requires the .cnf file for some functionality)",
        paths.openssl_cnf().display()
    );

    let input = work_dir.join("testfile.txt");
    std::fs::write(&input, CHECK_INPUT)
        .with_context(|| format!("Failed to write {}", input.display()))?;
    let checksum = work_dir.join("checksum.txt");

    let mut cmd = Command::new(paths.openssl_bin());
    cmd.arg("dgst")
        .arg("-sha256")
        .arg("-out")
        .arg(&checksum)
        .arg(&input)
        .current_dir(work_dir);
    exec::run(cmd)?;

    let report = std::fs::read_to_string(&checksum)
        .with_context(|| format!("Failed to read {}", checksum.display()))?;
    let digest = report.rsplit('=').next().unwrap_or("").trim();
    ensure!(
        digest == EXPECTED_DIGEST,
        "digest mismatch: got {digest}, expected {EXPECTED_DIGEST}"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_parses_after_last_equals_sign() {
        let report = format!("SHA256(testfile.txt)= {EXPECTED_DIGEST}\n");
        let digest = report.rsplit('=').next().unwrap_or("").trim();
        assert_eq!(digest, EXPECTED_DIGEST);
    }
}
