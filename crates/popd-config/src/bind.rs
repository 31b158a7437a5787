//! Parsing for the leading `[addr][:port]` bind argument.

use std::ffi::OsStr;
use std::net::{Ipv4Addr, SocketAddrV4};

use thiserror::Error;

/// Address and port taken from the positional bind argument.
///
/// Either half may be absent; [`BindSpec::resolve`] fills the gaps from the
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindSpec {
    address: Option<Ipv4Addr>,
    port: Option<u16>,
}

/// The positional bind argument could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid address and/or port: \"{argument}\"")]
pub struct InvalidBindSpec {
    /// Literal argument as supplied on the command line.
    pub argument: String,
}

impl BindSpec {
    /// Reports whether `arg` should be consumed as a bind specification.
    ///
    /// Only arguments starting with `:` or an ASCII digit qualify; anything
    /// else belongs to the protocol engine.
    #[must_use]
    pub fn detect(arg: &OsStr) -> bool {
        arg.as_encoded_bytes()
            .first()
            .is_some_and(|byte| *byte == b':' || byte.is_ascii_digit())
    }

    /// Parses an OS string argument, rejecting anything that is not UTF-8.
    pub fn parse_os(arg: &OsStr) -> Result<Self, InvalidBindSpec> {
        match arg.to_str() {
            Some(text) => Self::parse(text),
            None => Err(InvalidBindSpec {
                argument: arg.to_string_lossy().into_owned(),
            }),
        }
    }

    /// Parses `addr[:port]`, `:port`, or a bare `port`.
    ///
    /// The argument names an address only when it contains a `.`; the
    /// address must then be a dotted quad. A port must be decimal digits in
    /// `1..=65535`.
    pub fn parse(arg: &str) -> Result<Self, InvalidBindSpec> {
        let invalid = || InvalidBindSpec {
            argument: arg.to_owned(),
        };

        let (address, port_text) = if arg.contains('.') {
            let end = arg
                .find(|c: char| c != '.' && !c.is_ascii_digit())
                .unwrap_or(arg.len());
            let (address_text, rest) = arg.split_at(end);
            let address = address_text
                .parse::<Ipv4Addr>()
                .map_err(|_| invalid())?;
            let port_text = match rest.strip_prefix(':') {
                Some(port) => Some(port),
                None if rest.is_empty() => None,
                None => return Err(invalid()),
            };
            (Some(address), port_text)
        } else {
            (None, Some(arg.strip_prefix(':').unwrap_or(arg)))
        };

        let port = port_text
            .map(|text| parse_port(text).ok_or_else(invalid))
            .transpose()?;
        Ok(Self { address, port })
    }

    /// Address named by the argument, if any.
    #[must_use]
    pub const fn address(&self) -> Option<Ipv4Addr> {
        self.address
    }

    /// Port named by the argument, if any.
    #[must_use]
    pub const fn port(&self) -> Option<u16> {
        self.port
    }

    /// Combines the parsed halves with `fallback` for whatever was omitted.
    #[must_use]
    pub fn resolve(self, fallback: SocketAddrV4) -> SocketAddrV4 {
        SocketAddrV4::new(
            self.address.unwrap_or(*fallback.ip()),
            self.port.unwrap_or(fallback.port()),
        )
    }
}

fn parse_port(text: &str) -> Option<u16> {
    if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    text.parse::<u16>().ok().filter(|port| *port != 0)
}
