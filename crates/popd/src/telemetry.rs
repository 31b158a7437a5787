//! Structured telemetry initialisation for the supervisor.

use std::io::{self, IsTerminal};
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::EitherWriter;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use popd_config::LogFormat;

use crate::trace::TraceSink;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();
static CONSOLE_ENABLED: AtomicBool = AtomicBool::new(true);

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the trace filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global subscriber on first use.
///
/// Two layers are installed: one writing to standard error at `INFO` and one
/// writing to `trace`, at `DEBUG` when `debug` is set. Repeated calls are
/// idempotent.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or another global
/// subscriber is already installed.
pub fn initialise(
    debug: bool,
    format: LogFormat,
    trace: &TraceSink,
) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(debug, format, trace))
        .map(|_| TelemetryHandle)
}

/// Whether [`initialise`] has completed successfully.
#[must_use]
pub fn is_initialised() -> bool {
    TELEMETRY_GUARD.get().is_some()
}

/// Stops console output for the rest of the process.
///
/// Used by connection workers once standard error belongs to the client.
pub fn silence_console() {
    CONSOLE_ENABLED.store(false, Ordering::SeqCst);
}

fn install_subscriber(
    debug: bool,
    format: LogFormat,
    trace: &TraceSink,
) -> Result<(), TelemetryError> {
    let trace_filter = EnvFilter::try_new(if debug { "debug" } else { "info" })
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let layers = vec![
        format_layer(Console, format, io::stderr().is_terminal())
            .with_filter(LevelFilter::INFO)
            .boxed(),
        format_layer(trace.clone(), format, false)
            .with_filter(trace_filter)
            .boxed(),
    ];

    let subscriber = tracing_subscriber::registry().with(layers);
    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

fn format_layer<W>(writer: W, format: LogFormat, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_ansi(ansi)
        .with_timer(fmt::time::UtcTime::rfc_3339());
    match format {
        LogFormat::Json => base.json().flatten_event(true).boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}

#[derive(Debug, Clone, Copy)]
struct Console;

impl<'a> MakeWriter<'a> for Console {
    type Writer = EitherWriter<io::Stderr, io::Sink>;

    fn make_writer(&'a self) -> Self::Writer {
        if CONSOLE_ENABLED.load(Ordering::SeqCst) {
            EitherWriter::A(io::stderr())
        } else {
            EitherWriter::B(io::sink())
        }
    }
}
