//! Error types for agent-core

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::runner::RunnerState;

/// Result type alias for agent-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for agent operations
#[derive(Error, Debug)]
pub enum Error {
    /// Loading the configuration failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The runner was asked to do something its current state does not allow
    #[error("Cannot {action} while the agent is {from}")]
    InvalidTransition {
        from: RunnerState,
        action: &'static str,
    },

    /// Applying the configured log level failed
    #[error(transparent)]
    Logging(#[from] agent_utils::LoggingError),
}

/// Broad category of a configuration failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    NotFound,
    MalformedInput,
    ValidationFailure,
    Unknown,
}

impl fmt::Display for ConfigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "NotFound",
            Self::MalformedInput => "MalformedInput",
            Self::ValidationFailure => "ValidationFailure",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Errors produced while loading an agent configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file does not exist or cannot be opened
    #[error("Configuration file not found: {}", .path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not valid JSON
    #[error("Malformed JSON in {}: {source}", .path.display())]
    MalformedInput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The JSON parsed but does not match the configuration schema
    #[error("Invalid configuration in {}: {errors}", .path.display())]
    ValidationFailure {
        path: PathBuf,
        #[source]
        errors: ValidationErrors,
    },

    /// Any other failure while reading the file
    #[error("Failed to load configuration from {}: {source}", .path.display())]
    Unknown {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    /// Classify a read failure
    ///
    /// Missing files and files we are not allowed to open are `NotFound`;
    /// everything else (including content that is not UTF-8) is `Unknown`.
    pub(crate) fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                Self::NotFound { path, source }
            }
            _ => Self::Unknown { path, source },
        }
    }

    pub fn kind(&self) -> ConfigErrorKind {
        match self {
            Self::NotFound { .. } => ConfigErrorKind::NotFound,
            Self::MalformedInput { .. } => ConfigErrorKind::MalformedInput,
            Self::ValidationFailure { .. } => ConfigErrorKind::ValidationFailure,
            Self::Unknown { .. } => ConfigErrorKind::Unknown,
        }
    }

    /// Path of the file that failed to load
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path, .. }
            | Self::MalformedInput { path, .. }
            | Self::ValidationFailure { path, .. }
            | Self::Unknown { path, .. } => path,
        }
    }
}

/// A single field that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted field path, or the environment variable name
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every field error found while validating one configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// `Ok(())` when nothing was collected
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<FieldError> for ValidationErrors {
    fn from(error: FieldError) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => f.write_str("no validation errors"),
            [single] => write!(f, "{single}"),
            many => {
                write!(f, "{} validation errors: ", many.len())?;
                for (i, error) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{error}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationErrors {}
