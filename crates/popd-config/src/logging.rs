//! Diagnostics output format selection.

use strum::{Display, EnumString};

/// Output format used by every diagnostics layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON lines.
    Json,
    /// Single-line human readable output.
    #[default]
    Compact,
}

/// Error returned when a log format name is not recognised.
pub type LogFormatParseError = strum::ParseError;
