//! Logging and tracing utilities
//!
//! The subscriber is installed once at startup with [`init_tracing`]. Its
//! filter sits behind a reload layer so the severity threshold can be changed
//! later through the returned [`LogHandle`].

use std::fmt;
use std::io::IsTerminal;

use thiserror::Error;
use tracing_subscriber::{
    EnvFilter, Registry, filter::LevelFilter, layer::SubscriberExt, reload,
    util::SubscriberInitExt, util::TryInitError,
};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info";

/// Errors raised while installing or adjusting the logging setup
#[derive(Error, Debug)]
pub enum LoggingError {
    /// A global subscriber was already installed
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(#[from] TryInitError),

    /// The reloadable filter is no longer attached to a subscriber
    #[error("Failed to update log filter: {0}")]
    Reload(#[from] reload::Error),
}

/// A process-wide minimum severity that can be replaced at runtime
pub trait SeverityThreshold {
    /// Replace the current threshold with `level`
    fn set_threshold(&self, level: LevelFilter) -> Result<(), LoggingError>;
}

/// Handle to the filter installed by [`init_tracing`]
#[derive(Clone)]
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
}

impl fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogHandle").finish_non_exhaustive()
    }
}

impl SeverityThreshold for LogHandle {
    fn set_threshold(&self, level: LevelFilter) -> Result<(), LoggingError> {
        self.filter.reload(EnvFilter::new(level.to_string()))?;
        Ok(())
    }
}

/// Initialize tracing subscriber with default configuration
///
/// Events go to stdout, one line each, with a timestamp and level tag. The
/// initial filter comes from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
/// Call this once, before anything logs.
pub fn init_tracing() -> Result<LogHandle, LoggingError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(std::io::stdout().is_terminal())
                .with_writer(std::io::stdout),
        )
        .try_init()?;

    Ok(LogHandle { filter: handle })
}

/// Map a severity name onto a level filter
///
/// Matching is case-insensitive. Both the `tracing` names and the classic
/// `WARNING`/`CRITICAL`/`FATAL`/`NOTSET` spellings are accepted; `CRITICAL`
/// and `FATAL` collapse onto `ERROR`, the highest level `tracing` has.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    match name.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "NOTSET" => Some(LevelFilter::TRACE),
        "DEBUG" => Some(LevelFilter::DEBUG),
        "INFO" => Some(LevelFilter::INFO),
        "WARN" | "WARNING" => Some(LevelFilter::WARN),
        "ERROR" | "CRITICAL" | "FATAL" => Some(LevelFilter::ERROR),
        _ => None,
    }
}
