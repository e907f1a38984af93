//! Shared utilities for simple-agent
//!
//! This crate owns the process-wide logging setup: installing the tracing
//! subscriber, mapping severity names onto levels, and adjusting the
//! threshold once the agent configuration is known.

#[cfg(any(test, feature = "test-util"))]
pub mod capture;
pub mod logging;

#[cfg(any(test, feature = "test-util"))]
pub use capture::LogCapture;
pub use logging::{LogHandle, LoggingError, SeverityThreshold, init_tracing, parse_level};
pub use tracing_subscriber::filter::LevelFilter;
