//! Host platform probing and architecture metadata.
//!
//! The rest of the pipeline never asks "is this macOS?" directly: the
//! answers are probed once into a [`Capabilities`] value and each component
//! receives only the flags it needs.

/// Host operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// macOS: native keychain, universal binaries, system zlib.
    MacOs,
    /// Linux: flat trust-store file, explicit compiler/linker flags.
    Linux,
}

impl Os {
    /// The operating system this process is running on.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Linux
        }
    }
}

/// Target CPU architecture for one build pass.
///
/// Each architecture knows its configure-script target identifier and the
/// preprocessor guard used when concatenating per-architecture headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// 64-bit x86.
    X86_64,
    /// 32-bit x86.
    I386,
}

impl Arch {
    /// The 64-bit architecture of the build host word size.
    pub fn host_64_bit() -> Self {
        Self::X86_64
    }

    /// Canonical lowercase name (`x86_64`, `i386`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::I386 => "i386",
        }
    }

    /// Configure-script target tokens for this architecture on `os`.
    ///
    /// Always appended last to the argument list. The 64-bit macOS target
    /// carries an extra capability flag for the faster NIST P-256/P-521
    /// implementation.
    pub fn configure_targets(self, os: Os) -> &'static [&'static str] {
        match (os, self) {
            (Os::Linux, Self::X86_64) => &["linux-x86_64"],
            (Os::Linux, Self::I386) => &["linux-generic32"],
            (Os::MacOs, Self::X86_64) => &["darwin64-x86_64-cc", "enable-ec_nistp_64_gcc_128"],
            (Os::MacOs, Self::I386) => &["darwin-i386-cc"],
        }
    }

    /// Preprocessor guard symbol (`__x86_64__`, `__i386__`) used to wrap
    /// this architecture's block in a merged configuration header.
    pub fn guard(self) -> &'static str {
        match self {
            Self::X86_64 => "__x86_64__",
            Self::I386 => "__i386__",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x86_64" | "amd64" => Ok(Self::X86_64),
            "i386" | "x86" | "i686" => Ok(Self::I386),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}

/// Platform capability set, probed once at startup.
///
/// Components take this instead of re-querying platform identity, so the
/// OS-conditional surface of the whole pipeline is visible in one place.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    /// Operating system the capabilities were probed for.
    pub os: Os,
    /// Trust anchors live in a native OS keychain; the certificate
    /// bootstrap step applies.
    pub native_keychain: bool,
    /// No system-provided OpenSSL equivalent: the environment's
    /// CPPFLAGS/CFLAGS/LDFLAGS must be passed to configure verbatim.
    pub needs_env_flags: bool,
    /// The binary format supports multi-architecture (universal) files.
    pub universal_binaries: bool,
    /// Patch the zlib dlopen path before configuring (SIP keeps dyld's
    /// fallback path empty, so the library must be loaded by absolute
    /// path).
    pub zlib_shim: bool,
}

impl Capabilities {
    /// Probe the capability set for `os`.
    pub fn probe(os: Os) -> Self {
        let mac = os == Os::MacOs;
        Self {
            os,
            native_keychain: mac,
            needs_env_flags: !mac,
            universal_binaries: mac,
            zlib_shim: mac,
        }
    }
}
