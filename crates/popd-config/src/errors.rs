use thiserror::Error;

use crate::bind::InvalidBindSpec;

/// Errors raised while resolving startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The leading bind argument was malformed.
    #[error(transparent)]
    Bind(#[from] InvalidBindSpec),
    /// The option scan failed.
    #[error("failed to scan options: {source}")]
    Options {
        /// Underlying parser error.
        #[source]
        source: clap::Error,
    },
    /// An environment switch held an unrecognised value.
    #[error("{key}={value:?} is not valid; expected {expected}")]
    Environment {
        /// Variable name.
        key: &'static str,
        /// Value found.
        value: String,
        /// Accepted values.
        expected: &'static str,
    },
}
