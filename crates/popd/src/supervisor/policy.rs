use std::io;

use nix::errno::Errno;

/// Accept failures that are ignored without logging or counting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptErrorPolicy {
    transient: Vec<Errno>,
}

impl Default for AcceptErrorPolicy {
    /// Interrupted, would-block, protocol error, and aborted connection.
    fn default() -> Self {
        Self::empty()
            .allow(Errno::EINTR)
            .allow(Errno::EAGAIN)
            .allow(Errno::EWOULDBLOCK)
            .allow(Errno::EPROTO)
            .allow(Errno::ECONNABORTED)
    }
}

impl AcceptErrorPolicy {
    /// A policy treating every accept failure as worth reporting.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            transient: Vec::new(),
        }
    }

    /// Adds `errno` to the transient set.
    #[must_use]
    pub fn allow(mut self, errno: Errno) -> Self {
        if !self.transient.contains(&errno) {
            self.transient.push(errno);
        }
        self
    }

    /// Replaces the transient set.
    #[must_use]
    pub fn with_transient(transient: impl IntoIterator<Item = Errno>) -> Self {
        transient.into_iter().fold(Self::empty(), Self::allow)
    }

    /// Whether `error` should be silently ignored.
    #[must_use]
    pub fn is_transient(&self, error: &io::Error) -> bool {
        error
            .raw_os_error()
            .map(Errno::from_raw)
            .is_some_and(|errno| self.transient.contains(&errno))
    }

    /// Transient errnos in insertion order.
    #[must_use]
    pub fn transient(&self) -> &[Errno] {
        &self.transient
    }
}
