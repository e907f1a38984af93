//! Core of simple-agent
//!
//! This crate defines the validated agent configuration, the JSON loader that
//! produces it, and the runner that drives one agent through its placeholder
//! work loop.

pub mod config;
pub mod error;
pub mod parameters;
pub mod runner;

pub use config::{
    AgentConfig, AgentConfigBuilder, ConfigLoader, EnvFile, EnvSource, ProcessEnv, load_config,
};
pub use error::{ConfigError, ConfigErrorKind, Error, FieldError, Result, ValidationErrors};
pub use parameters::{ParamValue, Parameters};
pub use runner::{AgentRunner, RunReport, RunnerState, Sleeper, ThreadSleeper};
