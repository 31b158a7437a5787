//! Signal handlers feeding the accept loop's control flags.
//!
//! Handlers only touch atomics or reap already-exited children. They never
//! log, allocate, or take locks.

use std::io;
use std::sync::Arc;

use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use signal_hook::SigId;
use signal_hook::consts::signal::{SIGCHLD, SIGHUP, SIGINT, SIGTERM};
use signal_hook::low_level;
use thiserror::Error;
use tracing::debug;

use crate::supervisor::ControlFlags;

use super::PROCESS_TARGET;

/// Errors reported while installing signal handlers.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Registering a handler failed.
    #[error("failed to register handler for signal {signal}: {source}")]
    Register {
        /// Signal number.
        signal: i32,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Installed handlers; dropping the plan unregisters them.
#[derive(Debug)]
pub struct SignalPlan {
    ids: Vec<SigId>,
    reap_children: bool,
}

impl SignalPlan {
    /// Installs the child-exit, reload, and terminate handlers.
    ///
    /// Child reaping is only installed when `reap_children` is set; a
    /// thread-per-connection supervisor waits on its own children instead.
    /// `SIGINT` is treated like `SIGTERM` for foreground runs.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError`] when any registration fails.
    pub fn install(flags: &Arc<ControlFlags>, reap_children: bool) -> Result<Self, SignalError> {
        let mut plan = Self {
            ids: Vec::with_capacity(4),
            reap_children,
        };

        if reap_children {
            plan.register(SIGCHLD, || {
                reap_exited_children();
            })?;
        }

        let reload = Arc::clone(flags);
        plan.register(SIGHUP, move || reload.request_rotation())?;

        for terminate in [SIGTERM, SIGINT] {
            let shutdown = Arc::clone(flags);
            plan.register(terminate, move || {
                if reap_children {
                    reap_exited_children();
                }
                shutdown.request_shutdown();
            })?;
        }

        debug!(
            target: PROCESS_TARGET,
            reap_children,
            handlers = plan.ids.len(),
            "signal handlers installed"
        );
        Ok(plan)
    }

    /// Whether the child-exit handler is installed.
    #[must_use]
    pub const fn reaps_children(&self) -> bool {
        self.reap_children
    }

    fn register<F>(&mut self, signal: i32, action: F) -> Result<(), SignalError>
    where
        F: Fn() + Sync + Send + 'static,
    {
        // SAFETY: every action registered here only performs atomic stores or
        // `waitpid`, both of which are async-signal-safe.
        let id = unsafe { low_level::register(signal, action) }
            .map_err(|source| SignalError::Register { signal, source })?;
        self.ids.push(id);
        Ok(())
    }
}

impl Drop for SignalPlan {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            low_level::unregister(id);
        }
    }
}

/// Reaps every child that has already exited without blocking.
///
/// Returns the number of children reaped.
pub fn reap_exited_children() -> usize {
    let mut reaped = 0;
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(_) => return reaped,
            Ok(_) => reaped += 1,
        }
    }
}
