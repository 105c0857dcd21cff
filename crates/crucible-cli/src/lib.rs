//! crucible - OpenSSL build recipe
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Compiles OpenSSL from source for one or more target architectures,
//! merges per-architecture outputs into universal binaries, and bootstraps
//! a trust store from the system keychain.
//!
//! # Pipeline
//!
//! `crucible build` runs the whole recipe: probe platform capabilities
//! once, configure/compile/test each architecture in its own isolated
//! build directory, install, fuse universal artifacts when more than one
//! architecture was requested, then extract and validate certificates
//! from the system keychains into `<openssldir>/cert.pem`.
//!
//! # Directory Layout
//!
//! ```text
//! <prefix>/
//! ├── bin/openssl
//! ├── lib/               # libcrypto / libssl (+ engines/)
//! ├── include/openssl/   # opensslconf.h
//! └── share/man/
//! <openssldir>/
//! ├── cert.pem           # bootstrapped trust store
//! └── certs/             # user-supplied additions
//! ```

pub mod cmd;
pub mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crucible_core::InstallPaths;

#[derive(Debug, Parser)]
#[command(name = "crucible")]
#[command(author, version, about = "crucible - build OpenSSL with a bootstrapped trust store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build, install, merge universal artifacts, and bootstrap the trust store
    Build {
        /// OpenSSL source tree (defaults to the `source` key in crucible.toml)
        #[arg(long)]
        source: Option<PathBuf>,
        /// Install prefix
        #[arg(long)]
        prefix: Option<PathBuf>,
        /// Trust-store directory (defaults to <prefix>/etc/openssl)
        #[arg(long)]
        openssldir: Option<PathBuf>,
        /// Target architecture, in build order (repeatable)
        #[arg(long = "arch", value_name = "ARCH")]
        archs: Vec<String>,
        /// Build both supported architectures and merge universal binaries
        #[arg(long)]
        universal: bool,
        /// Skip build-time tests (not recommended)
        #[arg(long)]
        without_test: bool,
        /// Deprecated alias for --without-test
        #[arg(long, hide = true)]
        without_check: bool,
    },
    /// Re-run the certificate bootstrap against an existing install
    Bootstrap {
        /// Install prefix of the existing build
        #[arg(long)]
        prefix: Option<PathBuf>,
        /// Trust-store directory (defaults to <prefix>/etc/openssl)
        #[arg(long)]
        openssldir: Option<PathBuf>,
    },
    /// Verify the installed binary against a fixed digest regression
    Check {
        /// Install prefix of the existing build
        #[arg(long)]
        prefix: Option<PathBuf>,
        /// Trust-store directory (defaults to <prefix>/etc/openssl)
        #[arg(long)]
        openssldir: Option<PathBuf>,
    },
    /// Print the post-install message
    Caveats {
        /// Install prefix
        #[arg(long)]
        prefix: Option<PathBuf>,
        /// Trust-store directory (defaults to <prefix>/etc/openssl)
        #[arg(long)]
        openssldir: Option<PathBuf>,
    },
}

/// Default install prefix when neither the CLI nor crucible.toml names
/// one: `~/.crucible/openssl`.
pub fn default_prefix() -> PathBuf {
    dirs::home_dir().map_or_else(
        || PathBuf::from("/usr/local/crucible/openssl"),
        |home| home.join(".crucible/openssl"),
    )
}

/// The post-install message shown after a successful build.
pub fn caveats(paths: &InstallPaths) -> String {
    format!(
        "A CA file has been bootstrapped using certificates from the system\n\
         keychain. To add additional certificates, place .pem files in\n  {}\n\n\
         and run\n  {}\n",
        paths.user_certs().display(),
        paths.bin().join("c_rehash").display()
    )
}
