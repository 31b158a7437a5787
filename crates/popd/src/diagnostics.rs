//! Operator-facing message, error, and fatal reporting.
//!
//! Every line carries the program name and the `Server` role tag so that
//! supervisor output can be told apart from the protocol engine's own
//! messages in a shared trace file.

use std::error::Error;
use std::fmt::Display;
use std::io::{self, Write};
use std::panic::Location;
use std::process;
use std::sync::Arc;

use tracing::{error, info};

use crate::telemetry;
use crate::trace::TraceSink;

pub(crate) const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

const ROLE: &str = "Server";

/// Diagnostics facility shared by the supervisor and its workers.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    program: Arc<str>,
    trace: TraceSink,
}

impl Diagnostics {
    /// Creates a facility prefixing lines with `program`.
    #[must_use]
    pub fn new(program: &str, trace: TraceSink) -> Self {
        Self {
            program: Arc::from(program),
            trace,
        }
    }

    /// Program name used as the line prefix.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Trace sink released on the fatal path.
    #[must_use]
    pub const fn trace(&self) -> &TraceSink {
        &self.trace
    }

    /// Emits an informational line.
    pub fn message(&self, text: impl Display) {
        info!(target: SERVER_TARGET, "{}", self.compose(text));
    }

    /// Emits a non-fatal error line naming `error` and the caller's location.
    #[track_caller]
    pub fn error(&self, text: impl Display, error: &dyn Error) {
        let line = self.compose_error(text, error, Location::caller());
        error!(target: SERVER_TARGET, "{line}");
    }

    /// Emits a fatal line, releases the trace sink, and aborts the process.
    ///
    /// Before telemetry is installed the line goes straight to standard
    /// error.
    #[track_caller]
    pub fn fatal(&self, error: &dyn Error) -> ! {
        let line = self.compose_fatal(error, Location::caller());
        if telemetry::is_initialised() {
            error!(target: SERVER_TARGET, "{line}");
        } else {
            writeln!(io::stderr(), "{line}").ok();
        }
        self.trace.close();
        process::abort()
    }

    fn compose(&self, text: impl Display) -> String {
        format!("{}: {ROLE}: {text}", self.program)
    }

    fn compose_error(
        &self,
        text: impl Display,
        error: &dyn Error,
        location: &Location<'_>,
    ) -> String {
        format!(
            "{}: {error} [{}:{}]",
            self.compose(text),
            location.file(),
            location.line()
        )
    }

    fn compose_fatal(&self, error: &dyn Error, location: &Location<'_>) -> String {
        format!(
            "{} [{}:{}]",
            self.compose(error),
            location.file(),
            location.line()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("Permission denied (os error 13)")]
    struct Denied;

    #[test]
    fn message_lines_carry_program_and_role() {
        let diagnostics = Diagnostics::new("popper", TraceSink::disabled());
        assert_eq!(
            diagnostics.compose("listening on 0.0.0.0:110"),
            "popper: Server: listening on 0.0.0.0:110"
        );
    }

    #[test]
    fn error_lines_append_cause_and_location() {
        let diagnostics = Diagnostics::new("popd", TraceSink::disabled());
        let location = Location::caller();
        let line = diagnostics.compose_error("accept() error", &Denied, location);
        assert_eq!(
            line,
            format!(
                "popd: Server: accept() error: Permission denied (os error 13) [{}:{}]",
                location.file(),
                location.line()
            )
        );
    }

    #[test]
    fn fatal_lines_lead_with_the_error() {
        let diagnostics = Diagnostics::new("popd", TraceSink::disabled());
        let location = Location::caller();
        let line = diagnostics.compose_fatal(&Denied, location);
        assert!(line.starts_with("popd: Server: Permission denied (os error 13) ["));
        assert!(line.ends_with(&format!(":{}]", location.line())));
    }
}
