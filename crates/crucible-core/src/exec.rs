//! Blocking subprocess invocation.
//!
//! Every external toolchain step goes through here, so a failure always
//! reports the command's identity and exit status. There are no retries
//! and no timeouts: a hung subprocess hangs the pipeline.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::Context;

use crate::error::Error;
use crate::platform::Capabilities;

/// Resolved external commands the pipeline invokes.
///
/// Commands are located on `PATH` by default; tests and non-standard
/// hosts construct this directly to point at stand-ins.
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// Interpreter for the configure script.
    pub perl: PathBuf,
    /// Drives the depend / build / test / install targets.
    pub make: PathBuf,
    /// Binary-fusion command; present only when the platform supports
    /// universal binaries.
    pub lipo: Option<PathBuf>,
    /// Keychain-dump command; present only when the platform stores trust
    /// anchors in a native keychain.
    pub security: Option<PathBuf>,
}

impl Toolchain {
    /// Locate every command the probed capabilities call for.
    ///
    /// # Errors
    ///
    /// Returns an error if a required command cannot be found on `PATH`.
    pub fn locate(caps: Capabilities) -> anyhow::Result<Self> {
        let perl = which::which("perl").context("perl not found on PATH")?;
        let make = which::which("make").context("make not found on PATH")?;
        let lipo = if caps.universal_binaries {
            Some(which::which("lipo").context("lipo not found on PATH")?)
        } else {
            None
        };
        let security = if caps.native_keychain {
            Some(which::which("security").context("security not found on PATH")?)
        } else {
            None
        };
        Ok(Self {
            perl,
            make,
            lipo,
            security,
        })
    }
}

/// Render a command for diagnostics: program followed by its arguments.
pub(crate) fn render(cmd: &Command) -> String {
    let mut rendered = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}

/// Run a command to completion, inheriting stdio.
///
/// # Errors
///
/// Returns an error if the command cannot be launched or exits non-zero;
/// the error names the command and its exit status.
pub fn run(mut cmd: Command) -> Result<(), Error> {
    let command = render(&cmd);
    tracing::debug!(%command, "running");
    let status = cmd.status().map_err(|source| Error::Spawn {
        command: command.clone(),
        source,
    })?;
    if !status.success() {
        return Err(Error::Toolchain { command, status });
    }
    Ok(())
}

/// Run a command to completion and capture its stdout as text.
///
/// # Errors
///
/// Returns an error if the command cannot be launched or exits non-zero.
pub fn run_capture(mut cmd: Command) -> Result<String, Error> {
    let command = render(&cmd);
    tracing::debug!(%command, "running (capturing stdout)");
    let output = cmd.output().map_err(|source| Error::Spawn {
        command: command.clone(),
        source,
    })?;
    if !output.status.success() {
        return Err(Error::Toolchain {
            command,
            status: output.status,
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a command feeding `input` on stdin and report whether it exited
/// zero.
///
/// Used for per-certificate validity checks, where a non-zero exit is an
/// expected outcome rather than a failure; only failing to launch or wait
/// on the process is an error.
///
/// # Errors
///
/// Returns an error if the command cannot be spawned or waited on.
pub fn run_with_stdin_status(mut cmd: Command, input: &str) -> Result<bool, Error> {
    let command = render(&cmd);
    tracing::debug!(%command, "running (stdin piped)");
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    let mut child = cmd.spawn().map_err(|source| Error::Spawn {
        command: command.clone(),
        source,
    })?;
    if let Some(mut stdin) = child.stdin.take() {
        // The child may exit without draining stdin; a broken pipe is the
        // same as the check rejecting the input.
        let _ = stdin.write_all(input.as_bytes());
    }
    let status = child
        .wait()
        .map_err(|source| Error::Spawn { command, source })?;
    Ok(status.success())
}
