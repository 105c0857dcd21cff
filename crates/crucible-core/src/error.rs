//! Error taxonomy for the build and bootstrap pipeline.

use std::io;
use std::process::ExitStatus;

/// Errors surfaced by pipeline stages.
///
/// A single extracted certificate failing its expiry check is *not* an
/// error: it is excluded from the trust store and never surfaces here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An external toolchain command exited non-zero. Always fatal. A
    /// per-architecture artifact missing at merge time surfaces here via
    /// the fusion command's exit status.
    #[error("`{command}` failed with {status}")]
    Toolchain {
        /// The rendered command line that failed.
        command: String,
        /// Its exit status.
        status: ExitStatus,
    },

    /// An external command could not be launched at all.
    #[error("failed to launch `{command}`")]
    Spawn {
        /// The rendered command line that could not be started.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The OS keychain dump failed. Fatal for the certificate bootstrap
    /// step only; the installed build stays in place.
    #[error("keychain query `{command}` failed with {status}")]
    Keychain {
        /// The rendered query command line.
        command: String,
        /// Its exit status.
        status: ExitStatus,
    },

    /// The keychain dump contained a malformed or truncated PEM block.
    #[error("malformed certificate block at line {line}: {reason}")]
    MalformedPem {
        /// 1-based line number in the dump where the problem starts.
        line: usize,
        /// What was wrong with the block.
        reason: &'static str,
    },
}
