//! Startup configuration for the `popd` connection supervisor.
//!
//! The supervisor takes almost everything it needs from its own argument
//! vector: an optional leading `[addr][:port]` bind specification, plus the
//! debug and trace flags it shares with the protocol engine. Everything else
//! is forwarded untouched to the engine that serves each connection.
//!
//! A handful of process-level switches (foreground mode, connection
//! isolation strategy, engine program, log format) are read from the
//! environment through [`RuntimeSettings`].
//!
//! ```text
//! popd 199.46.50.7:8110 -S      bind 199.46.50.7:8110, forward ["popd", "-S"]
//! popd 8110 -S -T600            bind 0.0.0.0:8110, forward ["popd", "-S", "-T600"]
//! popd -d -t /var/log/pop.trace bind the default address, debug plus trace file
//! ```

mod args;
mod bind;
mod defaults;
mod environment;
mod errors;
mod logging;
mod options;
mod server;

pub use args::{ForwardedArgs, Invocation, is_version_flag, program_name};
pub use bind::{BindSpec, InvalidBindSpec};
pub use defaults::{
    DEFAULT_ADDRESS, DEFAULT_ENGINE_PROGRAM, DEFAULT_PORT, DEVELOPMENT_PORT, RELEASE_PORT,
    default_bind_address, default_log_format,
};
pub use environment::{
    ENGINE_ENV_VAR, FOREGROUND_ENV_VAR, ISOLATION_ENV_VAR, IsolationMode, LOG_FORMAT_ENV_VAR,
    LaunchMode, RuntimeSettings,
};
pub use errors::ConfigError;
pub use logging::{LogFormat, LogFormatParseError};
pub use options::{ENGINE_OPTSTRING, EngineFlags};
pub use server::ServerConfig;
