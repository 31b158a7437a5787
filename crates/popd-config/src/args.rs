//! Command-line invocation handling.

use std::ffi::{OsStr, OsString};
use std::path::Path;

use crate::bind::BindSpec;
use crate::defaults::default_bind_address;
use crate::errors::ConfigError;
use crate::options::EngineFlags;
use crate::server::ServerConfig;

/// What the supervisor was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Print the version banner and exit.
    Version,
    /// Bind and serve connections.
    Serve {
        /// Supervisor configuration derived from the arguments.
        config: ServerConfig,
        /// Arguments handed to the protocol engine for every connection.
        forwarded: ForwardedArgs,
    },
}

impl Invocation {
    /// Interprets a full argument vector, program name first.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Bind`] when the leading bind argument is
    /// malformed and [`ConfigError::Options`] when the option scan fails.
    pub fn parse<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        if args.get(1).is_some_and(|arg| is_version_flag(arg)) {
            return Ok(Self::Version);
        }

        let program = program_name(args.first().map(OsString::as_os_str));
        let mut bind = default_bind_address();
        if args.get(1).is_some_and(|arg| BindSpec::detect(arg)) {
            let spec = BindSpec::parse_os(&args.remove(1))?;
            bind = spec.resolve(bind);
        }

        let (debug, trace_path) = EngineFlags::scan(&args)?.into_parts();
        let config = ServerConfig::new(bind, program)
            .with_debug(debug)
            .with_trace_path(trace_path);
        Ok(Self::Serve {
            config,
            forwarded: ForwardedArgs::new(args),
        })
    }
}

/// Reports whether `arg` asks for the version banner (`-v…` or `--v…`).
#[must_use]
pub fn is_version_flag(arg: &OsStr) -> bool {
    let bytes = arg.as_encoded_bytes();
    bytes.starts_with(b"-v") || bytes.starts_with(b"--v")
}

/// Base name of `argv[0]`, or the package name when it is missing or empty.
#[must_use]
pub fn program_name(argv0: Option<&OsStr>) -> String {
    argv0
        .and_then(|arg| Path::new(arg).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| String::from("popd"))
}

/// Argument vector forwarded verbatim to the protocol engine.
///
/// The bind argument, when present, has already been removed; everything
/// else keeps its original order. Shared read-only between connections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardedArgs(Vec<OsString>);

impl ForwardedArgs {
    /// Wraps an argument vector, program name first.
    #[must_use]
    pub const fn new(args: Vec<OsString>) -> Self {
        Self(args)
    }

    /// The program name (`argv[0]`), if present.
    #[must_use]
    pub fn program(&self) -> Option<&OsStr> {
        self.0.first().map(OsString::as_os_str)
    }

    /// Arguments following the program name.
    #[must_use]
    pub fn operands(&self) -> &[OsString] {
        self.0.get(1..).unwrap_or_default()
    }

    /// Borrows the full vector.
    #[must_use]
    pub const fn as_slice(&self) -> &[OsString] {
        self.0.as_slice()
    }
}
