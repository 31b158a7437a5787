//! Process-per-connection dispatch.

use std::os::fd::{AsRawFd, IntoRawFd, RawFd};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use nix::sys::signal::{SigHandler, Signal, signal};
use nix::unistd::{ForkResult, close, dup2, fork};
use tracing::{debug, error};

use crate::supervisor::SupervisorState;
use crate::telemetry;
use crate::transport::SocketListener;

use super::{
    Connection, DISPATCH_TARGET, DispatchError, Dispatcher, ProtocolEngine, Session, WorkerError,
};

const CRASHED_STATUS: i32 = 1;
const STANDARD_STREAMS: [RawFd; 3] = [0, 1, 2];
const RESET_SIGNALS: [Signal; 4] = [
    Signal::SIGCHLD,
    Signal::SIGHUP,
    Signal::SIGTERM,
    Signal::SIGINT,
];

/// Runs each connection in a forked child process.
///
/// The child rebinds the connection onto descriptors 0, 1, and 2, runs the
/// engine with [`Session::Stdio`], and exits without unwinding. The parent
/// closes its copy of the connection and returns at once. Must only be used
/// while the supervisor is single-threaded.
#[derive(Debug)]
pub struct ForkDispatcher<E> {
    engine: Arc<E>,
}

impl<E: ProtocolEngine> ForkDispatcher<E> {
    /// Creates a dispatcher driving `engine`.
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

impl<E: ProtocolEngine> Dispatcher for ForkDispatcher<E> {
    fn dispatch(
        &self,
        connection: Connection,
        listener: &SocketListener,
        state: &SupervisorState,
    ) -> Result<(), DispatchError> {
        // SAFETY: the supervisor loop is the only thread when this strategy is
        // in use, so the child cannot inherit a lock held elsewhere.
        match unsafe { fork() }.map_err(|source| DispatchError::Fork { source })? {
            ForkResult::Child => run_worker(self.engine.as_ref(), connection, listener, state),
            ForkResult::Parent { child } => {
                debug!(
                    target: DISPATCH_TARGET,
                    pid = child.as_raw(),
                    peer = %connection.peer(),
                    "forked() for new connection"
                );
                drop(connection);
                Ok(())
            }
        }
    }
}

fn run_worker<E: ProtocolEngine>(
    engine: &E,
    connection: Connection,
    listener: &SocketListener,
    state: &SupervisorState,
) -> ! {
    debug!(target: DISPATCH_TARGET, "new child for connection");
    if let Err(error) = prepare_worker(connection, listener) {
        state.diagnostics().fatal(&error);
    }
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        engine.serve(state.args(), Session::Stdio);
    }));
    let status = if outcome.is_ok() {
        debug!(target: DISPATCH_TARGET, "exiting after protocol engine returned");
        0
    } else {
        CRASHED_STATUS
    };
    state.trace().close();
    // SAFETY: `_exit` ends the worker without running the supervisor's
    // destructors or atexit handlers a second time.
    unsafe { libc::_exit(status) }
}

/// Routes worker panics to the trace instead of the client socket.
fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        error!(
            target: DISPATCH_TARGET,
            panic = %info,
            "protocol engine panicked; worker exiting"
        );
    }));
}

fn prepare_worker(connection: Connection, listener: &SocketListener) -> Result<(), WorkerError> {
    for sig in RESET_SIGNALS {
        // SAFETY: installing the default disposition runs no Rust code in
        // signal context.
        unsafe { signal(sig, SigHandler::SigDfl) }.map_err(|source| {
            WorkerError::ResetSignal {
                signal: sig.as_str(),
                source,
            }
        })?;
    }

    let listener_fd = listener.as_raw_fd();
    close(listener_fd).map_err(|source| WorkerError::CloseListener {
        fd: listener_fd,
        source,
    })?;

    let (stream, _) = connection.into_parts();
    stream
        .set_nonblocking(false)
        .map_err(|source| WorkerError::Blocking { source })?;

    telemetry::silence_console();
    install_panic_hook();
    let fd = stream.into_raw_fd();
    for target in STANDARD_STREAMS {
        if fd != target {
            dup2(fd, target).map_err(|source| WorkerError::Redirect { fd, target, source })?;
        }
    }
    if !STANDARD_STREAMS.contains(&fd) {
        close(fd).ok();
    }
    Ok(())
}
