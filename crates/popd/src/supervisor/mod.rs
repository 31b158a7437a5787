//! The accept loop.
//!
//! Each iteration checks the control flags (shutdown first, then rotation),
//! waits for the listener to become readable, accepts one connection, and
//! hands it to the dispatcher. The wait is a `poll` on the listening socket
//! rather than a blocking `accept`, so a delivered signal always brings the
//! loop back to the flag checks.

mod control;
mod errors;
mod policy;
mod state;

use std::io;
use std::net::{SocketAddr, TcpStream};
use std::os::fd::AsFd;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use tracing::debug;

use crate::dispatch::{Connection, Dispatcher};
use crate::transport::SocketListener;

pub use self::control::ControlFlags;
pub use self::errors::SupervisorError;
pub use self::policy::AcceptErrorPolicy;
pub use self::state::SupervisorState;

const SUPERVISOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::supervisor");

/// Observable state of the accept loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for and dispatching connections.
    Running,
    /// Reopening the trace destination.
    RotatingLogs,
    /// Terminal: the listener and trace sink are closed.
    ShuttingDown,
}

enum Readiness {
    Readable,
    Interrupted,
}

/// Runs the accept loop over one listener.
#[derive(Debug)]
pub struct Supervisor<D> {
    listener: Option<SocketListener>,
    state: SupervisorState,
    dispatcher: D,
    policy: AcceptErrorPolicy,
    accept_errors: u64,
    dispatched: u64,
    loop_state: LoopState,
}

impl<D: Dispatcher> Supervisor<D> {
    /// Creates a supervisor using the default accept error policy.
    #[must_use]
    pub fn new(listener: SocketListener, state: SupervisorState, dispatcher: D) -> Self {
        Self {
            listener: Some(listener),
            state,
            dispatcher,
            policy: AcceptErrorPolicy::default(),
            accept_errors: 0,
            dispatched: 0,
            loop_state: LoopState::Running,
        }
    }

    /// Replaces the accept error policy.
    #[must_use]
    pub fn with_policy(mut self, policy: AcceptErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Iterates until shutdown is requested.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError`] for any failure the loop cannot survive.
    pub fn run(&mut self) -> Result<(), SupervisorError> {
        while self.step()? != LoopState::ShuttingDown {}
        Ok(())
    }

    /// Performs one loop iteration and reports the resulting state.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError`] when rotation, the readiness wait, or
    /// dispatch fails.
    pub fn step(&mut self) -> Result<LoopState, SupervisorError> {
        if self.loop_state == LoopState::ShuttingDown {
            return Ok(LoopState::ShuttingDown);
        }
        if self.state.flags().shutdown_requested() {
            self.shut_down();
            return Ok(self.loop_state);
        }
        if self.state.flags().rotation_requested() {
            self.loop_state = LoopState::RotatingLogs;
            self.rotate()?;
        }
        self.loop_state = LoopState::Running;

        let Some(listener) = self.listener.as_ref() else {
            return Ok(self.loop_state);
        };
        match wait_readable(listener)? {
            Readiness::Interrupted => return Ok(self.loop_state),
            Readiness::Readable => {}
        }
        let accepted = listener.accept();
        self.on_accept(accepted)?;
        Ok(self.loop_state)
    }

    /// Current loop state.
    #[must_use]
    pub const fn loop_state(&self) -> LoopState {
        self.loop_state
    }

    /// Accept failures reported so far; transient failures are not counted.
    #[must_use]
    pub const fn accept_errors(&self) -> u64 {
        self.accept_errors
    }

    /// Connections handed to the dispatcher so far.
    #[must_use]
    pub const fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// The listener, until shutdown closes it.
    #[must_use]
    pub const fn listener(&self) -> Option<&SocketListener> {
        self.listener.as_ref()
    }

    /// Shared loop state.
    #[must_use]
    pub const fn state(&self) -> &SupervisorState {
        &self.state
    }

    pub(crate) fn on_accept(
        &mut self,
        accepted: io::Result<(TcpStream, SocketAddr)>,
    ) -> Result<(), SupervisorError> {
        match accepted {
            Ok((stream, peer)) => {
                let Some(listener) = self.listener.as_ref() else {
                    return Ok(());
                };
                debug!(
                    target: SUPERVISOR_TARGET,
                    peer = %peer,
                    "new connection"
                );
                self.dispatcher
                    .dispatch(Connection::new(stream, peer), listener, &self.state)?;
                self.dispatched += 1;
                Ok(())
            }
            Err(error) if self.policy.is_transient(&error) => Ok(()),
            Err(error) => {
                self.accept_errors += 1;
                self.state.diagnostics().error("accept() error", &error);
                Ok(())
            }
        }
    }

    fn rotate(&self) -> Result<(), SupervisorError> {
        let trace = self.state.trace();
        debug!(target: SUPERVISOR_TARGET, "rolling over trace file...");
        let reopened = trace.rotate()?;
        self.state.flags().complete_rotation();
        if reopened {
            debug!(
                target: SUPERVISOR_TARGET,
                fd = trace.raw_fd(),
                path = ?trace.path(),
                "trace file reopened"
            );
        }
        Ok(())
    }

    fn shut_down(&mut self) {
        self.state
            .diagnostics()
            .message("cleaning up and exiting normally");
        drop(self.listener.take());
        self.state.trace().close();
        self.loop_state = LoopState::ShuttingDown;
    }
}

fn wait_readable(listener: &SocketListener) -> Result<Readiness, SupervisorError> {
    let mut fds = [PollFd::new(listener.as_fd(), PollFlags::POLLIN)];
    match poll(&mut fds, PollTimeout::NONE) {
        Ok(0) => Err(SupervisorError::UnexpectedReadiness {
            detail: String::from("no descriptor ready"),
        }),
        Ok(_) => {
            let revents = fds.first().and_then(|fd| fd.revents());
            if revents.is_some_and(|flags| flags.contains(PollFlags::POLLIN)) {
                Ok(Readiness::Readable)
            } else {
                Err(SupervisorError::UnexpectedReadiness {
                    detail: format!("listener reported {revents:?}"),
                })
            }
        }
        Err(Errno::EINTR) => Ok(Readiness::Interrupted),
        Err(source) => Err(SupervisorError::Wait { source }),
    }
}
