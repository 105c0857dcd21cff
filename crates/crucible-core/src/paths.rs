//! Install-prefix and trust-store directory layout.

use std::path::{Path, PathBuf};

/// Filesystem layout of one installation.
///
/// ```text
/// <prefix>/
/// ├── bin/openssl                       # command-line tool
/// ├── lib/                              # libcrypto / libssl
/// │   └── engines/                      # dynamically loaded plugins
/// ├── include/openssl/opensslconf.h     # generated configuration header
/// └── share/man/                        # manual pages
///
/// <openssldir>/
/// ├── cert.pem                          # bootstrapped trust store
/// ├── certs/                            # user-supplied additions
/// └── openssl.cnf                       # installed by `make install`
/// ```
#[derive(Debug, Clone)]
pub struct InstallPaths {
    prefix: PathBuf,
    openssldir: PathBuf,
}

impl InstallPaths {
    /// Layout rooted at `prefix`. The trust-store directory defaults to
    /// `<prefix>/etc/openssl` when not given explicitly.
    pub fn new(prefix: PathBuf, openssldir: Option<PathBuf>) -> Self {
        let openssldir = openssldir.unwrap_or_else(|| prefix.join("etc/openssl"));
        Self { prefix, openssldir }
    }

    /// Install prefix root.
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Trust-store directory.
    pub fn openssldir(&self) -> &Path {
        &self.openssldir
    }

    /// Executable directory.
    pub fn bin(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    /// The installed command-line binary.
    pub fn openssl_bin(&self) -> PathBuf {
        self.bin().join("openssl")
    }

    /// Library directory.
    pub fn lib(&self) -> PathBuf {
        self.prefix.join("lib")
    }

    /// Engine plugin directory.
    pub fn engines(&self) -> PathBuf {
        self.lib().join("engines")
    }

    /// The installed generated configuration header.
    pub fn conf_header(&self) -> PathBuf {
        self.prefix.join("include/openssl/opensslconf.h")
    }

    /// Manual-pages directory.
    pub fn man(&self) -> PathBuf {
        self.prefix.join("share/man")
    }

    /// The trust-store file.
    pub fn cert_pem(&self) -> PathBuf {
        self.openssldir.join("cert.pem")
    }

    /// Directory where users drop additional `.pem` certificates.
    pub fn user_certs(&self) -> PathBuf {
        self.openssldir.join("certs")
    }

    /// The installed configuration file.
    pub fn openssl_cnf(&self) -> PathBuf {
        self.openssldir.join("openssl.cnf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openssldir_defaults_under_prefix() {
        let paths = InstallPaths::new(PathBuf::from("/opt/ssl"), None);
        assert_eq!(paths.openssldir(), Path::new("/opt/ssl/etc/openssl"));
        assert_eq!(paths.cert_pem(), PathBuf::from("/opt/ssl/etc/openssl/cert.pem"));
    }

    #[test]
    fn explicit_openssldir_wins() {
        let paths = InstallPaths::new(PathBuf::from("/opt/ssl"), Some(PathBuf::from("/etc/ssl")));
        assert_eq!(paths.openssldir(), Path::new("/etc/ssl"));
        assert_eq!(paths.conf_header(), PathBuf::from("/opt/ssl/include/openssl/opensslconf.h"));
        assert_eq!(paths.engines(), PathBuf::from("/opt/ssl/lib/engines"));
    }
}
