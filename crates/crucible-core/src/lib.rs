//! crucible-core: build orchestration for OpenSSL.
//!
//! Compiles the library from source for one or more target architectures,
//! merges per-architecture outputs into universal binaries, and bootstraps
//! a certificate trust store from the host keychain.
//!
//! # Pipeline
//!
//! 1. [`platform::Capabilities`] is probed once; every OS-conditional
//!    decision downstream is answered by it.
//! 2. [`config::configure_args`] plans the configure invocation for each
//!    architecture.
//! 3. [`builder::BuildOrchestrator`] drives configure / depend / build /
//!    test, one isolated build directory per architecture, then installs.
//! 4. [`merge::BinaryMerger`] fuses staged artifacts into universal
//!    binaries (multi-architecture builds only).
//! 5. [`certs::CertificateBootstrapper`] dumps the system keychains,
//!    validates each certificate with the freshly built binary, and writes
//!    the trust store atomically.
//!
//! Everything is synchronous: each external toolchain step is a blocking
//! subprocess, and no two steps ever run concurrently.

pub mod builder;
pub mod certs;
pub mod check;
pub mod config;
pub mod env;
pub mod error;
pub mod exec;
pub mod fsutil;
pub mod merge;
pub mod paths;
pub mod platform;

pub use error::Error;
pub use exec::Toolchain;
pub use paths::InstallPaths;
pub use platform::{Arch, Capabilities, Os};
