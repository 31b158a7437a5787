//! Supervisor configuration resolved from the command line.

use std::net::SocketAddrV4;
use std::path::{Path, PathBuf};

/// Everything the supervisor needs before it binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    bind: SocketAddrV4,
    debug: bool,
    trace_path: Option<PathBuf>,
    program_name: String,
}

impl ServerConfig {
    /// Builds a configuration with debug off and no trace file.
    #[must_use]
    pub fn new(bind: SocketAddrV4, program_name: impl Into<String>) -> Self {
        Self {
            bind,
            debug: false,
            trace_path: None,
            program_name: program_name.into(),
        }
    }

    /// Sets the debug flag.
    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the trace file path. A trace file forces debug on.
    #[must_use]
    pub fn with_trace_path(mut self, trace_path: Option<PathBuf>) -> Self {
        if trace_path.is_some() {
            self.debug = true;
        }
        self.trace_path = trace_path;
        self
    }

    /// Address and port to listen on.
    #[must_use]
    pub const fn bind(&self) -> SocketAddrV4 {
        self.bind
    }

    /// Whether debug diagnostics are enabled.
    #[must_use]
    pub const fn debug(&self) -> bool {
        self.debug
    }

    /// Trace file path, if one was requested.
    #[must_use]
    pub fn trace_path(&self) -> Option<&Path> {
        self.trace_path.as_deref()
    }

    /// Name used to prefix diagnostics.
    #[must_use]
    pub fn program_name(&self) -> &str {
        &self.program_name
    }
}
