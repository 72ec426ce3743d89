//! Telemetry and Observability
//!
//! Sets up `tracing-subscriber` for structured logging. Log lines go to
//! stderr so CLI answers on stdout stay clean.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output
    Pretty,

    /// One JSON object per line
    Json,
}

impl Default for LogFormat {
    /// Pretty in debug builds, JSON in release builds
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

/// Filter directive for a level: the level globally and for this crate
pub fn default_filter(log_level: &str) -> String {
    format!(
        "{level},switchboard_engine={level},api_server={level}",
        level = log_level
    )
}

/// Initialize the tracing subscriber with the given log level and format.
///
/// Priority: `RUST_LOG` env var > `log_level` parameter.
/// Calling this more than once is a no-op.
pub fn init_telemetry_with(log_level: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok(),
    };
}

/// Initialize the tracing subscriber with the given log level from config.
///
/// In debug builds: pretty-printed terminal output.
/// In release builds: JSON structured output with spans.
pub fn init_telemetry_with_level(log_level: &str) {
    init_telemetry_with(log_level, LogFormat::default());
}
