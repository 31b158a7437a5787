//! Flags shared between signal handlers and the accept loop.

use std::sync::atomic::{AtomicBool, Ordering};

/// Control flags set asynchronously and cleared only by the accept loop.
///
/// The signal-side methods are lock-free and allocation-free so they may be
/// called from a signal handler. A rotation request is ignored while a
/// previous one is still pending, mirroring a reload handler that stays
/// disarmed until the loop has acted.
#[derive(Debug)]
pub struct ControlFlags {
    shutdown: AtomicBool,
    rotate: AtomicBool,
    reload_armed: AtomicBool,
}

impl Default for ControlFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlFlags {
    /// Creates flags with nothing requested and the reload path armed.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            shutdown: AtomicBool::new(false),
            rotate: AtomicBool::new(false),
            reload_armed: AtomicBool::new(true),
        }
    }

    /// Requests graceful shutdown. Signal-safe.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Requests log rotation unless one is already pending. Signal-safe.
    pub fn request_rotation(&self) {
        if self.reload_armed.swap(false, Ordering::SeqCst) {
            self.rotate.store(true, Ordering::SeqCst);
        }
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Whether rotation has been requested.
    #[must_use]
    pub fn rotation_requested(&self) -> bool {
        self.rotate.load(Ordering::SeqCst)
    }

    /// Whether a rotation request would currently be accepted.
    #[must_use]
    pub fn reload_armed(&self) -> bool {
        self.reload_armed.load(Ordering::SeqCst)
    }

    /// Clears the rotation flag and re-arms the reload path.
    pub fn complete_rotation(&self) {
        self.rotate.store(false, Ordering::SeqCst);
        self.reload_armed.store(true, Ordering::SeqCst);
    }
}
