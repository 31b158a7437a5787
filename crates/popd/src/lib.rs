//! Standalone supervisor for a POP3 mail-retrieval server.
//!
//! `popd` owns the server's lifecycle and leaves the protocol itself to an
//! external engine. At startup it resolves the bind address from its first
//! argument, opens the optional trace file, installs telemetry, and (unless
//! told to stay in the foreground) detaches into the background. It then
//! binds a non-blocking listening socket and enters the accept loop.
//!
//! The loop is driven by [`ControlFlags`] that signal handlers set
//! asynchronously: `SIGHUP` requests trace rotation and `SIGTERM` requests a
//! graceful shutdown, which always wins over a pending rotation. Every
//! accepted connection goes to a [`Dispatcher`]. The default
//! [`ForkDispatcher`] forks a worker whose standard streams are the client
//! socket, so the engine can be written as if it talked to a terminal;
//! [`ThreadDispatcher`] keeps connections in-process behind a panic
//! boundary.
//!
//! Fatal conditions are reported through [`Diagnostics`] with the program
//! name, a `Server` role tag, the cause, and the source location, and then
//! abort the process. An address already in use is the one expected
//! failure: it prints `addr:port in use` and exits with status 1.

mod diagnostics;
mod dispatch;
mod process;
mod supervisor;
pub mod telemetry;
mod trace;
mod transport;

pub use diagnostics::Diagnostics;
pub use dispatch::{
    CommandEngine, Connection, DispatchError, Dispatcher, ForkDispatcher, ProtocolEngine, Session,
    ThreadDispatcher, WorkerError,
};
pub use process::{
    DaemonizeError, Daemonizer, Disposition, LaunchError, LaunchPlan, SignalError, SignalPlan,
    SystemDaemonizer, reap_exited_children, run_server, run_server_with,
};
pub use supervisor::{
    AcceptErrorPolicy, ControlFlags, LoopState, Supervisor, SupervisorError, SupervisorState,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use trace::{TraceError, TraceSink, TraceWriter};
pub use transport::{LISTEN_BACKLOG, ListenerError, SocketListener};

#[cfg(test)]
mod tests;
