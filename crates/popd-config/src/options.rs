//! Extracts the supervisor's own flags from the forwarded argument vector.
//!
//! The protocol engine owns the option grammar. The supervisor only needs
//! `-d` and `-t <file>`, but must walk the whole vector with the engine's
//! option table so that values such as `-T 600` are never mistaken for
//! flags.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use crate::errors::ConfigError;

/// Option table understood by the protocol engine, in `getopt` notation.
pub const ENGINE_OPTSTRING: &str = "b:BcCdD:e:f:FkK:l:L:p:RsSt:T:uUvy:";

const DEBUG_OPTION: &str = "d";
const TRACE_OPTION: &str = "t";
const OPERANDS: &str = "operands";

/// Flags the supervisor shares with the protocol engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineFlags {
    debug: bool,
    trace_path: Option<PathBuf>,
}

impl EngineFlags {
    /// Scans `args` (program name first) without consuming anything.
    ///
    /// A trace file implies debug output. When `-t` appears more than once
    /// the last path wins. Scanning stops quietly at the first option the
    /// table does not describe.
    pub fn scan(args: &[OsString]) -> Result<Self, ConfigError> {
        let matches = engine_command()
            .try_get_matches_from(args)
            .map_err(|source| ConfigError::Options { source })?;
        Ok(Self::from_matches(&matches))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        let debug_count = matches.get_one::<u8>(DEBUG_OPTION).copied().unwrap_or(0);
        let trace_path = matches
            .get_many::<OsString>(TRACE_OPTION)
            .and_then(Iterator::last)
            .map(PathBuf::from);
        Self {
            debug: debug_count > 0 || trace_path.is_some(),
            trace_path,
        }
    }

    /// Whether debug diagnostics were requested.
    #[must_use]
    pub const fn debug(&self) -> bool {
        self.debug
    }

    /// Trace file requested with `-t`, if any.
    #[must_use]
    pub fn trace_path(&self) -> Option<&PathBuf> {
        self.trace_path.as_ref()
    }

    /// Splits the flags into their parts.
    #[must_use]
    pub fn into_parts(self) -> (bool, Option<PathBuf>) {
        (self.debug, self.trace_path)
    }
}

fn engine_command() -> Command {
    let table = ENGINE_OPTSTRING.as_bytes();
    let mut command = Command::new(env!("CARGO_PKG_NAME"))
        .disable_help_flag(true)
        .disable_version_flag(true)
        .ignore_errors(true)
        .arg(
            Arg::new(OPERANDS)
                .action(ArgAction::Append)
                .value_parser(value_parser!(OsString)),
        );

    for (index, letter) in ENGINE_OPTSTRING.char_indices() {
        let Some(id) = ENGINE_OPTSTRING.get(index..index + letter.len_utf8()) else {
            continue;
        };
        if letter == ':' {
            continue;
        }
        let option = Arg::new(id).short(letter);
        command = command.arg(if table.get(index + 1) == Some(&b':') {
            option
                .action(ArgAction::Append)
                .num_args(1)
                .allow_hyphen_values(true)
                .value_parser(value_parser!(OsString))
        } else {
            option.action(ArgAction::Count)
        });
    }
    command
}
