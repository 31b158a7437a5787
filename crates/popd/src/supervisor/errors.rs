use nix::errno::Errno;
use thiserror::Error;

use crate::dispatch::DispatchError;
use crate::trace::TraceError;

/// Failures that stop the accept loop.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Waiting for the listener to become readable failed.
    #[error("poll() error: {source}")]
    Wait {
        /// Underlying errno.
        #[source]
        source: Errno,
    },
    /// The readiness wait returned without the listener being readable.
    #[error("unexpected poll() result: {detail}")]
    UnexpectedReadiness {
        /// What the wait reported instead.
        detail: String,
    },
    /// Reopening the trace file during rotation failed.
    #[error("log rotation failed: {source}")]
    Rotate {
        /// Underlying trace error.
        #[source]
        source: TraceError,
    },
    /// Handing a connection to a worker failed.
    #[error("dispatch failed: {source}")]
    Dispatch {
        /// Underlying dispatch error.
        #[source]
        source: DispatchError,
    },
}

impl From<TraceError> for SupervisorError {
    fn from(source: TraceError) -> Self {
        Self::Rotate { source }
    }
}

impl From<DispatchError> for SupervisorError {
    fn from(source: DispatchError) -> Self {
        Self::Dispatch { source }
    }
}
