//! Listening socket for inbound client connections.

mod errors;
mod listener;

pub use self::errors::ListenerError;
pub use self::listener::{LISTEN_BACKLOG, SocketListener};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
