//! Process-level switches read from the environment.

use std::env;
use std::ffi::OsString;
use std::str::FromStr;

use strum::{Display, EnumString};

use crate::defaults::{DEFAULT_ENGINE_PROGRAM, default_log_format};
use crate::errors::ConfigError;
use crate::logging::LogFormat;

/// Presence keeps the supervisor attached to the terminal.
pub const FOREGROUND_ENV_VAR: &str = "POPD_FOREGROUND";
/// Selects the connection isolation strategy.
pub const ISOLATION_ENV_VAR: &str = "POPD_ISOLATION";
/// Names the protocol engine program.
pub const ENGINE_ENV_VAR: &str = "POPD_ENGINE";
/// Selects the diagnostics format.
pub const LOG_FORMAT_ENV_VAR: &str = "POPD_LOG_FORMAT";

/// Launch mode for the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Detach from the controlling terminal.
    Background,
    /// Stay attached; used for debugging and tests.
    Foreground,
}

/// How each accepted connection is isolated from the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum IsolationMode {
    /// One child process per connection.
    #[default]
    Process,
    /// One thread per connection.
    Thread,
}

/// Environment-derived settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    launch_mode: LaunchMode,
    isolation: IsolationMode,
    engine_program: OsString,
    log_format: LogFormat,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            launch_mode: LaunchMode::Background,
            isolation: IsolationMode::default(),
            engine_program: OsString::from(DEFAULT_ENGINE_PROGRAM),
            log_format: default_log_format(),
        }
    }
}

impl RuntimeSettings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Environment`] for unrecognised values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var_os(key))
    }

    /// Reads settings through `lookup`, which maps variable names to values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Environment`] for unrecognised values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let launch_mode = if lookup(FOREGROUND_ENV_VAR).is_some() {
            LaunchMode::Foreground
        } else {
            LaunchMode::Background
        };
        let isolation =
            parse_choice(&lookup, ISOLATION_ENV_VAR, "process|thread")?.unwrap_or_default();
        let log_format = parse_choice(&lookup, LOG_FORMAT_ENV_VAR, "compact|json")?
            .unwrap_or_else(default_log_format);
        let engine_program = lookup(ENGINE_ENV_VAR)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| OsString::from(DEFAULT_ENGINE_PROGRAM));
        Ok(Self {
            launch_mode,
            isolation,
            engine_program,
            log_format,
        })
    }

    /// Replaces the launch mode.
    #[must_use]
    pub const fn with_launch_mode(mut self, launch_mode: LaunchMode) -> Self {
        self.launch_mode = launch_mode;
        self
    }

    /// Replaces the isolation mode.
    #[must_use]
    pub const fn with_isolation(mut self, isolation: IsolationMode) -> Self {
        self.isolation = isolation;
        self
    }

    /// Whether to detach from the terminal.
    #[must_use]
    pub const fn launch_mode(&self) -> LaunchMode {
        self.launch_mode
    }

    /// Connection isolation strategy.
    #[must_use]
    pub const fn isolation(&self) -> IsolationMode {
        self.isolation
    }

    /// Program run as the protocol engine.
    #[must_use]
    pub fn engine_program(&self) -> &OsString {
        &self.engine_program
    }

    /// Diagnostics format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

fn parse_choice<T, F>(
    lookup: &F,
    key: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<OsString>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let text = raw.to_string_lossy();
    text.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::Environment {
            key,
            value: text.into_owned(),
            expected,
        })
}
