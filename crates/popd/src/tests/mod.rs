//! Test suites for the supervisor.

mod supervisor_behaviour;
pub(crate) mod support;
