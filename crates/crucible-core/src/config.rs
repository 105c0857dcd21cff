//! Configure-step argument construction.

use crate::env::BuildEnv;
use crate::paths::InstallPaths;
use crate::platform::{Arch, Capabilities};

/// Build the full, ordered argument list for the configure script.
///
/// Fixed feature set: both legacy SSL protocol versions and inline
/// assembly disabled, dynamic zlib linkage, shared-library output, and CMS
/// enabled. On platforms without a system OpenSSL equivalent the
/// environment's preprocessor/compiler/linker flags are appended verbatim.
/// The architecture's configure target tokens always come last.
///
/// Pure function: passing an architecture the platform cannot build is a
/// programmer error, not a runtime failure.
pub fn configure_args(
    caps: Capabilities,
    paths: &InstallPaths,
    env: &BuildEnv,
    arch: Arch,
) -> Vec<String> {
    let mut args = vec![
        format!("--prefix={}", paths.prefix().display()),
        format!("--openssldir={}", paths.openssldir().display()),
        "no-ssl2".to_string(),
        "no-ssl3".to_string(),
        "no-asm".to_string(),
        "zlib-dynamic".to_string(),
        "shared".to_string(),
        "enable-cms".to_string(),
    ];
    if caps.needs_env_flags {
        args.extend(env.flag_args());
    }
    args.extend(
        arch.configure_targets(caps.os)
            .iter()
            .map(|t| (*t).to_string()),
    );
    args
}
