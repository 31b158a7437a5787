//! Supervises launch sequencing from argument parsing to shutdown.

use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::os::fd::RawFd;
use std::process::ExitCode;
use std::sync::Arc;

use popd_config::{
    ForwardedArgs, Invocation, IsolationMode, LaunchMode, RuntimeSettings, ServerConfig,
    is_version_flag, program_name,
};
use tracing::debug;

use crate::diagnostics::Diagnostics;
use crate::dispatch::{CommandEngine, ForkDispatcher, ProtocolEngine, ThreadDispatcher};
use crate::supervisor::{ControlFlags, Supervisor, SupervisorState};
use crate::telemetry;
use crate::trace::TraceSink;
use crate::transport::SocketListener;

use super::daemonizer::{DaemonizeError, Daemonizer, SystemDaemonizer};
use super::errors::{Disposition, LaunchError};
use super::signals::SignalPlan;
use super::PROCESS_TARGET;

const ADDRESS_IN_USE_STATUS: u8 = 1;

/// Collaborators required to launch the supervisor.
#[derive(Debug)]
pub struct LaunchPlan<D, E> {
    /// Detaches the process in background mode.
    pub daemonizer: D,
    /// Serves each accepted connection.
    pub engine: E,
    /// Environment-derived switches.
    pub settings: RuntimeSettings,
}

/// Runs the supervisor with the production collaborators.
///
/// A version query is answered before the environment is read, so it never
/// has side effects.
#[must_use]
pub fn run_server() -> ExitCode {
    let args: Vec<OsString> = env::args_os().collect();
    if args.get(1).is_some_and(|arg| is_version_flag(arg)) {
        return print_version(&args);
    }
    let settings = match RuntimeSettings::from_env() {
        Ok(settings) => settings,
        Err(error) => startup_diagnostics(&args).fatal(&error),
    };
    let engine = CommandEngine::new(settings.engine_program().clone());
    run_server_with(
        args,
        LaunchPlan {
            daemonizer: SystemDaemonizer::new(),
            engine,
            settings,
        },
    )
}

/// Runs the supervisor with injected collaborators.
///
/// Returns success after a requested shutdown and status 1 when the bind
/// address is already in use. Every other failure aborts through
/// [`Diagnostics::fatal`].
pub fn run_server_with<D, E>(args: Vec<OsString>, plan: LaunchPlan<D, E>) -> ExitCode
where
    D: Daemonizer,
    E: ProtocolEngine,
{
    let (config, forwarded) = match Invocation::parse(args.iter().cloned()) {
        Ok(Invocation::Version) => return print_version(&args),
        Ok(Invocation::Serve { config, forwarded }) => (config, forwarded),
        Err(error) => startup_diagnostics(&args).fatal(&error),
    };
    let trace = match TraceSink::from_config(config.trace_path()) {
        Ok(trace) => trace,
        Err(error) => startup_diagnostics(&args).fatal(&error),
    };
    let diagnostics = Diagnostics::new(config.program_name(), trace);

    match serve(&config, forwarded, plan, &diagnostics) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => match error.disposition() {
            Disposition::AddressInUse(addr) => {
                writeln!(io::stderr(), "{addr} in use").ok();
                ExitCode::from(ADDRESS_IN_USE_STATUS)
            }
            Disposition::Fatal => diagnostics.fatal(&error),
        },
    }
}

fn serve<D, E>(
    config: &ServerConfig,
    forwarded: ForwardedArgs,
    plan: LaunchPlan<D, E>,
    diagnostics: &Diagnostics,
) -> Result<(), LaunchError>
where
    D: Daemonizer,
    E: ProtocolEngine,
{
    let LaunchPlan {
        daemonizer,
        engine,
        settings,
    } = plan;

    telemetry::initialise(config.debug(), settings.log_format(), diagnostics.trace())?;
    detach_if_background(settings.launch_mode(), &daemonizer, diagnostics.trace())?;

    let listener = SocketListener::bind(config.bind(), config.debug())?;
    diagnostics.message(format_args!("listening on {}", listener.local_addr()));

    let isolation = settings.isolation();
    let flags = Arc::new(ControlFlags::new());
    let _signals = SignalPlan::install(&flags, isolation == IsolationMode::Process)?;
    let state = SupervisorState::new(flags, Arc::new(forwarded), diagnostics.clone());
    debug!(
        target: PROCESS_TARGET,
        %isolation,
        pid = std::process::id(),
        "entering accept loop"
    );

    match isolation {
        IsolationMode::Process => {
            Supervisor::new(listener, state, ForkDispatcher::new(engine)).run()?;
        }
        IsolationMode::Thread => {
            Supervisor::new(listener, state, ThreadDispatcher::new(engine)).run()?;
        }
    }
    Ok(())
}

/// Detaches unless running in the foreground, preserving the trace file.
pub(crate) fn detach_if_background<D: Daemonizer>(
    mode: LaunchMode,
    daemonizer: &D,
    trace: &TraceSink,
) -> Result<(), DaemonizeError> {
    if matches!(mode, LaunchMode::Background) {
        let keep: Option<RawFd> = trace.raw_fd();
        daemonizer.detach(keep)?;
    }
    Ok(())
}

fn startup_diagnostics(args: &[OsString]) -> Diagnostics {
    Diagnostics::new(
        &program_name(args.first().map(OsString::as_os_str)),
        TraceSink::disabled(),
    )
}

fn print_version(args: &[OsString]) -> ExitCode {
    let program = program_name(args.first().map(OsString::as_os_str));
    writeln!(
        io::stdout(),
        "{program} version {} (standalone)",
        env!("CARGO_PKG_VERSION")
    )
    .ok();
    ExitCode::SUCCESS
}
