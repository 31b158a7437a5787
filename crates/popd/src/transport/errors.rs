//! Error types for socket listener operations.

use std::io;
use std::net::SocketAddrV4;

use thiserror::Error;

/// Errors surfaced while creating or configuring the listening socket.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The stream socket could not be created.
    #[error("Can't open stream socket: {source}")]
    Create {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Address reuse could not be enabled.
    #[error("setsockopt(SO_REUSEADDR) failed: {source}")]
    ReuseAddress {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Another socket already holds the address.
    #[error("{addr} in use")]
    AddressInUse {
        /// Address that could not be bound.
        addr: SocketAddrV4,
    },
    /// Binding failed for any other reason.
    #[error("Can't bind local address {addr}: {source}")]
    Bind {
        /// Address that could not be bound.
        addr: SocketAddrV4,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The socket could not start listening.
    #[error("listen() failed: {source}")]
    Listen {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Non-blocking mode could not be enabled.
    #[error("Unable to set listener to be non-blocking: {source}")]
    NonBlocking {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
