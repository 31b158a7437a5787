//! Defines the unified error surface for supervisor launch.

use std::net::SocketAddrV4;

use popd_config::ConfigError;
use thiserror::Error;

use crate::supervisor::SupervisorError;
use crate::telemetry::TelemetryError;
use crate::trace::TraceError;
use crate::transport::ListenerError;

use super::daemonizer::DaemonizeError;
use super::signals::SignalError;

/// Errors surfaced while launching or running the supervisor.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Startup arguments or environment were invalid.
    #[error(transparent)]
    Config {
        /// Underlying configuration error.
        #[from]
        source: ConfigError,
    },
    /// The trace file could not be opened.
    #[error(transparent)]
    Trace {
        /// Underlying trace error.
        #[from]
        source: TraceError,
    },
    /// Telemetry could not be installed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[from]
        source: TelemetryError,
    },
    /// Daemonisation failed.
    #[error("failed to daemonise: {source}")]
    Daemonize {
        /// Underlying daemonisation error.
        #[from]
        source: DaemonizeError,
    },
    /// The listening socket could not be set up.
    #[error(transparent)]
    Listener {
        /// Underlying listener error.
        #[from]
        source: ListenerError,
    },
    /// Signal handlers could not be installed.
    #[error("failed to install signal handlers: {source}")]
    Signals {
        /// Underlying signal error.
        #[from]
        source: SignalError,
    },
    /// The accept loop stopped on an unrecoverable failure.
    #[error(transparent)]
    Supervisor {
        /// Underlying supervisor error.
        #[from]
        source: SupervisorError,
    },
}

/// How the launcher reacts to a [`LaunchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Report the busy address on standard error and exit with status 1.
    AddressInUse(SocketAddrV4),
    /// Report through the fatal diagnostics path and abort.
    Fatal,
}

impl LaunchError {
    /// Classifies the error as an expected condition or a fatal one.
    #[must_use]
    pub const fn disposition(&self) -> Disposition {
        match self {
            Self::Listener {
                source: ListenerError::AddressInUse { addr },
            } => Disposition::AddressInUse(*addr),
            _ => Disposition::Fatal,
        }
    }
}
