//! Detaches the supervisor from its terminal.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{IntoRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::process;

use daemonize_me::Daemon;
use nix::errno::Errno;
use nix::unistd::{ForkResult, SysconfVar, close, dup2, fork, sysconf};
use thiserror::Error;

const DISCARD_DEVICE: &str = "/dev/null";
const CONSOLE_DEVICE: &str = "/dev/console";
const FALLBACK_OPEN_MAX: RawFd = 1024;

/// Abstraction over daemonisation strategies.
#[cfg_attr(test, mockall::automock)]
pub trait Daemonizer: Send + Sync {
    /// Detaches into the background, keeping only `keep` open besides
    /// freshly bound standard streams.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonizeError`] when any step fails; the caller must not
    /// continue running.
    fn detach(&self, keep: Option<RawFd>) -> Result<(), DaemonizeError>;
}

/// Errors surfaced by the daemonisation backend.
#[derive(Debug, Error)]
pub enum DaemonizeError {
    /// Forking, session creation, or the directory change failed.
    #[error("{0}")]
    System(#[from] daemonize_me::DaemonError),
    /// The fork that gives up session leadership failed.
    #[error("fork() after setsid() failed: {source}")]
    Fork {
        /// Underlying errno.
        #[source]
        source: Errno,
    },
    /// The descriptor limit could not be queried.
    #[error("sysconf(_SC_OPEN_MAX) failed: {source}")]
    DescriptorLimit {
        /// Underlying errno.
        #[source]
        source: Errno,
    },
    /// A standard stream device could not be opened.
    #[error("unable to open {path}: {source}")]
    OpenDevice {
        /// Device path.
        path: &'static str,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A standard stream could not be rebound.
    #[error("unable to rebind descriptor {target}: {source}")]
    Redirect {
        /// Standard stream descriptor.
        target: RawFd,
        /// Underlying errno.
        #[source]
        source: Errno,
    },
}

/// Daemoniser built on `daemonize-me`.
///
/// `daemonize-me` forks once, calls `setsid`, and changes to `/`. A second
/// fork follows so the surviving process is not a session leader and can
/// never reacquire a controlling terminal. Every descriptor other than
/// `keep` is then closed. Standard input is then bound to `/dev/null` and
/// standard output and error to the console, or `/dev/null` when the
/// console cannot be opened.
#[derive(Debug, Default)]
pub struct SystemDaemonizer;

impl SystemDaemonizer {
    /// Builds a new system daemoniser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Daemonizer for SystemDaemonizer {
    fn detach(&self, keep: Option<RawFd>) -> Result<(), DaemonizeError> {
        Daemon::new()
            .work_dir("/")
            .name(std::ffi::OsStr::new(env!("CARGO_PKG_NAME")))
            .start()?;
        leave_session_leadership()?;
        close_descriptors(keep)?;
        rebind_standard_streams()
    }
}

fn leave_session_leadership() -> Result<(), DaemonizeError> {
    // SAFETY: the supervisor is still single-threaded during start-up.
    match unsafe { fork() }.map_err(|source| DaemonizeError::Fork { source })? {
        ForkResult::Parent { .. } => process::exit(0),
        ForkResult::Child => Ok(()),
    }
}

fn close_descriptors(keep: Option<RawFd>) -> Result<(), DaemonizeError> {
    let limit = sysconf(SysconfVar::OPEN_MAX)
        .map_err(|source| DaemonizeError::DescriptorLimit { source })?
        .and_then(|value| RawFd::try_from(value).ok())
        .unwrap_or(FALLBACK_OPEN_MAX);
    for fd in (0..limit).rev() {
        if Some(fd) != keep {
            close(fd).ok();
        }
    }
    Ok(())
}

fn rebind_standard_streams() -> Result<(), DaemonizeError> {
    let discard = open_device(DISCARD_DEVICE, OpenOptions::new().read(true).write(true))?;
    redirect(discard, &[0])?;

    let mut console_options = OpenOptions::new();
    console_options.write(true).custom_flags(libc::O_NOCTTY);
    let console = open_device(CONSOLE_DEVICE, &console_options)
        .or_else(|_| open_device(DISCARD_DEVICE, OpenOptions::new().write(true)))?;
    redirect(console, &[1, 2])
}

fn open_device(path: &'static str, options: &OpenOptions) -> Result<File, DaemonizeError> {
    options
        .open(path)
        .map_err(|source| DaemonizeError::OpenDevice { path, source })
}

fn redirect(file: File, targets: &[RawFd]) -> Result<(), DaemonizeError> {
    let fd = file.into_raw_fd();
    for &target in targets {
        if fd != target {
            dup2(fd, target).map_err(|source| DaemonizeError::Redirect { target, source })?;
        }
    }
    if !targets.contains(&fd) {
        close(fd).ok();
    }
    Ok(())
}
