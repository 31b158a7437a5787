use std::net::TcpStream;
use std::sync::Arc;

use popd_config::ForwardedArgs;

/// How a protocol engine reaches its client.
#[derive(Debug)]
pub enum Session {
    /// Standard input, output, and error are the client connection.
    Stdio,
    /// The client connection is handed over directly.
    Socket(TcpStream),
}

/// Serves one client session to completion.
///
/// The engine owns all protocol behaviour; the supervisor only guarantees
/// that the client's bytes reach it. Its outcome is not observed.
pub trait ProtocolEngine: Send + Sync + 'static {
    /// Runs one session with the forwarded argument vector.
    fn serve(&self, args: &ForwardedArgs, session: Session);
}

impl<T: ProtocolEngine + ?Sized> ProtocolEngine for Arc<T> {
    fn serve(&self, args: &ForwardedArgs, session: Session) {
        (**self).serve(args, session);
    }
}
