//! Hands accepted connections to isolated workers.
//!
//! A [`Dispatcher`] receives each accepted [`Connection`] and must return
//! without waiting for the session to finish. Two strategies are provided:
//! [`ForkDispatcher`] runs every connection in its own child process with
//! the socket rebound onto the standard streams, and [`ThreadDispatcher`]
//! runs it on a dedicated thread behind a panic boundary. Both drive a
//! [`ProtocolEngine`], the opaque handler for one complete session.

mod command;
mod engine;
mod errors;
mod fork;
mod thread;

use std::net::{SocketAddr, TcpStream};

use crate::supervisor::SupervisorState;
use crate::transport::SocketListener;

pub use self::command::CommandEngine;
pub use self::engine::{ProtocolEngine, Session};
pub use self::errors::{DispatchError, WorkerError};
pub use self::fork::ForkDispatcher;
pub use self::thread::ThreadDispatcher;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// A freshly accepted client connection.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Connection {
    /// Wraps an accepted stream and its peer address.
    #[must_use]
    pub const fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self { stream, peer }
    }

    /// Remote address of the client.
    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Splits the connection into its stream and peer address.
    #[must_use]
    pub fn into_parts(self) -> (TcpStream, SocketAddr) {
        (self.stream, self.peer)
    }
}

/// Strategy for isolating one connection from the supervisor.
pub trait Dispatcher {
    /// Starts serving `connection` and returns without waiting for it.
    ///
    /// `listener` is the supervisor's listening socket; implementations
    /// must not let it leak into the connection's handling context.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when no worker could be started.
    fn dispatch(
        &self,
        connection: Connection,
        listener: &SocketListener,
        state: &SupervisorState,
    ) -> Result<(), DispatchError>;
}
