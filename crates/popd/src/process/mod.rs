pub(crate) mod daemonizer;
mod errors;
pub(crate) mod launch;
pub(crate) mod signals;

pub use daemonizer::{DaemonizeError, Daemonizer, SystemDaemonizer};
pub use errors::{Disposition, LaunchError};
pub use launch::{LaunchPlan, run_server, run_server_with};
pub use signals::{SignalError, SignalPlan, reap_exited_children};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
