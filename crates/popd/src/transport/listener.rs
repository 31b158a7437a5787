//! Listener implementation for the supervisor's TCP endpoint.

use std::io;
use std::mem;
use std::net::{SocketAddr, SocketAddrV4, TcpListener, TcpStream};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::ptr;

use socket2::{Domain, SockAddr, Socket, Type};
use tracing::{debug, warn};

use super::{LISTENER_TARGET, ListenerError};

/// Pending-connection backlog passed to `listen`.
pub const LISTEN_BACKLOG: i32 = 5;

#[expect(
    clippy::cast_possible_truncation,
    reason = "c_int is four bytes on every supported target"
)]
const INT_OPTION_LEN: libc::socklen_t = mem::size_of::<libc::c_int>() as libc::socklen_t;

/// Bound, listening, non-blocking IPv4 socket.
#[derive(Debug)]
pub struct SocketListener {
    listener: TcpListener,
    local_addr: SocketAddrV4,
}

impl SocketListener {
    /// Creates, configures, and binds the listening socket.
    ///
    /// Address reuse is always enabled. When `debug` is set the kernel's
    /// socket debugging is requested too; failure there is only logged.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::AddressInUse`] when another socket holds
    /// `addr`, and another [`ListenerError`] variant for any other failure.
    pub fn bind(addr: SocketAddrV4, debug: bool) -> Result<Self, ListenerError> {
        let socket = Socket::new(Domain::IPV4, Type::STREAM, None)
            .map_err(|source| ListenerError::Create { source })?;
        socket
            .set_reuse_address(true)
            .map_err(|source| ListenerError::ReuseAddress { source })?;
        let debug_outcome = debug.then(|| enable_socket_debug(&socket));
        socket
            .bind(&SockAddr::from(addr))
            .map_err(|source| classify_bind_error(addr, source))?;
        // Reported only once bound so an in-use address leaves no trace output.
        if let Some(Err(error)) = debug_outcome {
            warn!(
                target: LISTENER_TARGET,
                error = %error,
                "setsockopt(SO_DEBUG) failed"
            );
        }
        socket
            .listen(LISTEN_BACKLOG)
            .map_err(|source| ListenerError::Listen { source })?;
        socket
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;

        let listener = TcpListener::from(socket);
        let local_addr = match listener.local_addr() {
            Ok(SocketAddr::V4(bound)) => bound,
            _ => addr,
        };
        debug!(
            target: LISTENER_TARGET,
            addr = %local_addr,
            fd = listener.as_raw_fd(),
            "listening socket ready"
        );
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Address the socket is bound to, with any ephemeral port resolved.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddrV4 {
        self.local_addr
    }

    /// Accepts one pending connection without blocking.
    ///
    /// # Errors
    ///
    /// Returns the raw accept failure; callers decide which are transient.
    pub fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.listener.accept()
    }
}

impl AsFd for SocketListener {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.listener.as_fd()
    }
}

impl AsRawFd for SocketListener {
    fn as_raw_fd(&self) -> RawFd {
        self.listener.as_raw_fd()
    }
}

fn classify_bind_error(addr: SocketAddrV4, source: io::Error) -> ListenerError {
    if source.kind() == io::ErrorKind::AddrInUse {
        ListenerError::AddressInUse { addr }
    } else {
        ListenerError::Bind { addr, source }
    }
}

fn enable_socket_debug(socket: &Socket) -> io::Result<()> {
    let enable: libc::c_int = 1;
    // SAFETY: the descriptor is owned by `socket` and the option value points
    // at a live `c_int` whose size is passed alongside it.
    let result = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_DEBUG,
            ptr::from_ref(&enable).cast(),
            INT_OPTION_LEN,
        )
    };
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, TcpStream};
    use std::thread;
    use std::time::{Duration, Instant};

    fn loopback() -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)
    }

    #[test]
    fn binds_ephemeral_port_in_non_blocking_mode() {
        let listener = SocketListener::bind(loopback(), false).expect("bind listener");
        assert_ne!(listener.local_addr().port(), 0);
        let error = listener.accept().expect_err("no client yet");
        assert_eq!(error.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn accepts_pending_client() {
        let listener = SocketListener::bind(loopback(), true).expect("bind listener");
        let client = TcpStream::connect(listener.local_addr()).expect("connect client");
        let deadline = Instant::now() + Duration::from_secs(2);
        let (_stream, peer) = loop {
            match listener.accept() {
                Ok(accepted) => break accepted,
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    assert!(Instant::now() < deadline, "client never became ready");
                    thread::sleep(Duration::from_millis(10));
                }
                Err(error) => panic!("accept failed: {error}"),
            }
        };
        assert_eq!(peer, client.local_addr().expect("client address"));
    }

    #[test]
    fn reports_address_in_use() {
        let holder = std::net::TcpListener::bind(loopback()).expect("bind holder");
        let SocketAddr::V4(taken) = holder.local_addr().expect("holder address") else {
            panic!("expected an IPv4 address");
        };
        let error = SocketListener::bind(taken, false).expect_err("second bind must fail");
        assert!(matches!(error, ListenerError::AddressInUse { addr } if addr == taken));
        assert_eq!(error.to_string(), format!("{taken} in use"));
    }
}
