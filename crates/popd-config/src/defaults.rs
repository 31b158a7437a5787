use std::net::{Ipv4Addr, SocketAddrV4};

use crate::logging::LogFormat;

/// Well-known POP3 port.
pub const RELEASE_PORT: u16 = 110;

/// Port used by development builds so they never collide with a live server.
pub const DEVELOPMENT_PORT: u16 = 8765;

/// Port used when the bind argument omits one.
pub const DEFAULT_PORT: u16 = if cfg!(debug_assertions) {
    DEVELOPMENT_PORT
} else {
    RELEASE_PORT
};

/// Address used when the bind argument omits one.
pub const DEFAULT_ADDRESS: Ipv4Addr = Ipv4Addr::UNSPECIFIED;

/// Engine program run for each connection unless overridden.
pub const DEFAULT_ENGINE_PROGRAM: &str = "popper";

/// Default listening endpoint.
#[must_use]
pub const fn default_bind_address() -> SocketAddrV4 {
    SocketAddrV4::new(DEFAULT_ADDRESS, DEFAULT_PORT)
}

/// Default diagnostics format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
