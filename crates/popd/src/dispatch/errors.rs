use std::io;
use std::os::fd::RawFd;

use nix::errno::Errno;
use thiserror::Error;

/// Failures starting a worker for a connection.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Forking the worker process failed.
    #[error("fork() error: {source}")]
    Fork {
        /// Underlying errno.
        #[source]
        source: Errno,
    },
    /// Spawning the worker thread failed.
    #[error("failed to spawn connection thread: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Failures preparing a worker before the protocol engine runs.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// A signal disposition could not be reset.
    #[error("unable to reset {signal} disposition: {source}")]
    ResetSignal {
        /// Signal name.
        signal: &'static str,
        /// Underlying errno.
        #[source]
        source: Errno,
    },
    /// The inherited listening socket could not be closed.
    #[error("unable to close listening socket ({fd}): {source}")]
    CloseListener {
        /// Listener descriptor.
        fd: RawFd,
        /// Underlying errno.
        #[source]
        source: Errno,
    },
    /// The connection could not be switched back to blocking mode.
    #[error("Unable to set connection to be blocking: {source}")]
    Blocking {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The connection could not be duplicated onto a standard stream.
    #[error("unable to rebind connection ({fd}) onto descriptor {target}: {source}")]
    Redirect {
        /// Connection descriptor.
        fd: RawFd,
        /// Standard stream descriptor.
        target: RawFd,
        /// Underlying errno.
        #[source]
        source: Errno,
    },
}
