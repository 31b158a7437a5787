//! Thread-per-connection dispatch.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use crate::supervisor::SupervisorState;
use crate::transport::SocketListener;

use super::{Connection, DISPATCH_TARGET, DispatchError, Dispatcher, ProtocolEngine, Session};

/// Runs each connection on its own named thread.
///
/// The engine receives the stream through [`Session::Socket`] and runs
/// behind a panic boundary, so a crashing session ends only its own thread.
/// The listener is never shared with the worker thread.
#[derive(Debug)]
pub struct ThreadDispatcher<E> {
    engine: Arc<E>,
}

impl<E: ProtocolEngine> ThreadDispatcher<E> {
    /// Creates a dispatcher driving `engine`.
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Creates a dispatcher sharing an existing engine.
    #[must_use]
    pub const fn from_shared(engine: Arc<E>) -> Self {
        Self { engine }
    }
}

impl<E: ProtocolEngine> Dispatcher for ThreadDispatcher<E> {
    fn dispatch(
        &self,
        connection: Connection,
        _listener: &SocketListener,
        state: &SupervisorState,
    ) -> Result<(), DispatchError> {
        let (stream, peer) = connection.into_parts();
        if let Err(error) = stream.set_nonblocking(false) {
            state
                .diagnostics()
                .error("Unable to set connection to be blocking", &error);
            return Ok(());
        }

        let engine = Arc::clone(&self.engine);
        let args = Arc::clone(state.args());
        thread::Builder::new()
            .name(format!("conn-{peer}"))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    engine.serve(&args, Session::Socket(stream));
                }));
                if outcome.is_err() {
                    warn!(
                        target: DISPATCH_TARGET,
                        peer = %peer,
                        "protocol engine panicked; connection dropped"
                    );
                } else {
                    debug!(target: DISPATCH_TARGET, peer = %peer, "session finished");
                }
            })
            .map_err(|source| DispatchError::Spawn { source })?;
        Ok(())
    }
}
