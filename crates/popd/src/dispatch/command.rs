//! Protocol engine backed by an external program.

use std::ffi::OsString;
use std::io;
use std::os::fd::OwnedFd;
use std::os::unix::process::CommandExt;
use std::process::{Command, ExitStatus, Stdio};

use popd_config::ForwardedArgs;
use tracing::{debug, error};

use super::{DISPATCH_TARGET, ProtocolEngine, Session};

/// Runs `program` once per session with the forwarded arguments.
///
/// `argv[0]` is taken from the forwarded vector so the engine sees the name
/// the supervisor was started under. The program's standard streams are the
/// client connection.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: OsString,
}

impl CommandEngine {
    /// Creates an engine running `program`, resolved through `PATH`.
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Program run for each session.
    #[must_use]
    pub const fn program(&self) -> &OsString {
        &self.program
    }

    fn command(&self, args: &ForwardedArgs) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg0(args.program().unwrap_or_else(|| self.program.as_os_str()))
            .args(args.operands());
        command
    }

    fn run(&self, args: &ForwardedArgs, session: Session) -> io::Result<ExitStatus> {
        let mut command = self.command(args);
        if let Session::Socket(stream) = session {
            let output = stream.try_clone()?;
            let errors = stream.try_clone()?;
            command
                .stdin(Stdio::from(OwnedFd::from(stream)))
                .stdout(Stdio::from(OwnedFd::from(output)))
                .stderr(Stdio::from(OwnedFd::from(errors)));
        }
        command.status()
    }
}

impl ProtocolEngine for CommandEngine {
    fn serve(&self, args: &ForwardedArgs, session: Session) {
        match self.run(args, session) {
            Ok(status) => debug!(
                target: DISPATCH_TARGET,
                program = ?self.program,
                %status,
                "protocol engine finished"
            ),
            Err(source) => error!(
                target: DISPATCH_TARGET,
                program = ?self.program,
                error = %source,
                "failed to run protocol engine"
            ),
        }
    }
}
