//! Agent configuration record and its JSON loader
//!
//! A configuration is assembled in explicit layers:
//!
//! 1. built-in defaults,
//! 2. `AGENT_*` entries of the `.env` file in the working directory,
//! 3. `AGENT_*` process environment variables,
//! 4. the keys present in the JSON file.
//!
//! Later layers win field by field, so the file's explicit values take
//! precedence and the environment only fills what the file leaves out. The
//! merged draft is then validated and frozen into an [`AgentConfig`].
//!
//! # Example
//!
//! ```json
//! {
//!   "name": "Collector",
//!   "version": "2.1",
//!   "log_level": "debug",
//!   "parameters": {"interval_seconds": 5}
//! }
//! ```

use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use crate::error::{ConfigError, FieldError, ValidationErrors};
use crate::parameters::{DEFAULT_INTERVAL, Parameters};

pub const DEFAULT_NAME: &str = "DefaultAgent";
pub const DEFAULT_VERSION: &str = "1.0";
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

/// Prefix of the environment variables that can supply configuration fields
pub const ENV_PREFIX: &str = "AGENT_";

/// Environment file read by [`ConfigLoader::new`], relative to the working directory
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Well-known field names, shared by the JSON document and the environment
pub mod fields {
    pub const NAME: &str = "name";
    pub const VERSION: &str = "version";
    pub const LOG_LEVEL: &str = "log_level";
    pub const PARAMETERS: &str = "parameters";
}

/// Validated settings for a single agent run
///
/// Fields are read-only once constructed. `interval_seconds` inside the
/// parameters has already been checked, so [`AgentConfig::interval`] cannot
/// fail.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    name: String,
    version: String,
    log_level: String,
    parameters: Parameters,
    interval: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            version: DEFAULT_VERSION.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            parameters: Parameters::default(),
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl AgentConfig {
    /// Create a new configuration builder
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Severity name as written in the configuration
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Delay between placeholder tasks
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Builder for AgentConfig
///
/// Each field is optional; unset fields fall back to the defaults in
/// [`AgentConfigBuilder::build`]. Builders also serve as configuration
/// layers that can be stacked with [`AgentConfigBuilder::merge`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentConfigBuilder {
    name: Option<String>,
    version: Option<String>,
    log_level: Option<String>,
    parameters: Option<Parameters>,
}

impl AgentConfigBuilder {
    /// Set the agent name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the agent version
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the log level name
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Set the parameter bag
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Overlay `other` on top of this layer; fields set in `other` win
    pub fn merge(self, other: AgentConfigBuilder) -> Self {
        Self {
            name: other.name.or(self.name),
            version: other.version.or(self.version),
            log_level: other.log_level.or(self.log_level),
            parameters: other.parameters.or(self.parameters),
        }
    }

    /// Read the fields present in a parsed JSON document
    ///
    /// Missing keys and `null` values leave the field unset; unknown keys are
    /// ignored. All type mismatches are reported together.
    pub fn from_json(document: &Value) -> Result<Self, ValidationErrors> {
        let Value::Object(map) = document else {
            return Err(FieldError::new(
                "<root>",
                format!("expected a JSON object, got {}", json_type(document)),
            )
            .into());
        };

        let mut layer = Self::default();
        let mut errors = ValidationErrors::new();

        let mut string_field = |key: &str| match map.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                errors.push(FieldError::new(
                    key,
                    format!("expected a string, got {}", json_type(other)),
                ));
                None
            }
        };
        layer.name = string_field(fields::NAME);
        layer.version = string_field(fields::VERSION);
        layer.log_level = string_field(fields::LOG_LEVEL);

        layer.parameters = match map.get(fields::PARAMETERS) {
            None | Some(Value::Null) => None,
            Some(Value::Object(params)) => Some(Parameters::from(params.clone())),
            Some(other) => {
                errors.push(FieldError::new(
                    fields::PARAMETERS,
                    format!("expected a mapping, got {}", json_type(other)),
                ));
                None
            }
        };

        errors.into_result().map(|()| layer)
    }

    /// Read the fields supplied through `AGENT_*` environment variables
    ///
    /// String fields are taken verbatim. `AGENT_PARAMETERS` must hold a JSON
    /// object.
    pub fn from_env(env: &impl EnvSource) -> Result<Self, ValidationErrors> {
        let var = |field: &str| env.var(&env_key(field));

        let mut layer = Self {
            name: var(fields::NAME),
            version: var(fields::VERSION),
            log_level: var(fields::LOG_LEVEL),
            parameters: None,
        };

        if let Some(raw) = var(fields::PARAMETERS) {
            let key = env_key(fields::PARAMETERS);
            match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(params)) => layer.parameters = Some(Parameters::from(params)),
                Ok(other) => {
                    return Err(FieldError::new(
                        key,
                        format!("expected a JSON object, got {}", json_type(&other)),
                    )
                    .into());
                }
                Err(e) => {
                    return Err(FieldError::new(key, format!("invalid JSON: {e}")).into());
                }
            }
        }

        Ok(layer)
    }

    /// Fill in defaults, validate, and freeze the configuration
    pub fn build(self) -> Result<AgentConfig, ValidationErrors> {
        let defaults = AgentConfig::default();
        let parameters = self.parameters.unwrap_or(defaults.parameters);
        let interval = parameters.interval()?;

        Ok(AgentConfig {
            name: self.name.unwrap_or(defaults.name),
            version: self.version.unwrap_or(defaults.version),
            log_level: self.log_level.unwrap_or(defaults.log_level),
            parameters,
            interval,
        })
    }
}

/// Environment variable name for a configuration field
pub fn env_key(field: &str) -> String {
    format!("{ENV_PREFIX}{}", field.to_ascii_uppercase())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// Source of environment variables
pub trait EnvSource {
    /// Value of `key`, if set and valid Unicode
    fn var(&self, key: &str) -> Option<String>;
}

/// The current process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Variables declared in a dotenv file
///
/// The file is only read, never exported into the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvFile {
    vars: HashMap<String, String>,
}

impl EnvFile {
    /// Parse the file at `path`; a missing file yields no variables
    pub fn load(path: &Path) -> Result<Self, FieldError> {
        let invalid = |e: dotenvy::Error| {
            FieldError::new(
                path.display().to_string(),
                format!("invalid environment file: {e}"),
            )
        };

        let entries = match dotenvy::from_path_iter(path) {
            Ok(entries) => entries,
            Err(e) if e.not_found() => return Ok(Self::default()),
            Err(e) => return Err(invalid(e)),
        };

        let vars = entries
            .collect::<Result<HashMap<_, _>, _>>()
            .map_err(invalid)?;
        Ok(Self { vars })
    }
}

impl EnvSource for EnvFile {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.var(key)
    }
}

/// Loads [`AgentConfig`] from a JSON file
///
/// Performs exactly one read attempt. Success is logged at info level; every
/// failure is logged at error level with its kind and path, then returned.
#[derive(Debug, Clone)]
pub struct ConfigLoader<E = ProcessEnv> {
    env: E,
    env_file: Option<PathBuf>,
}

impl Default for ConfigLoader<ProcessEnv> {
    fn default() -> Self {
        Self::with_env(ProcessEnv).env_file(DEFAULT_ENV_FILE)
    }
}

impl ConfigLoader<ProcessEnv> {
    /// Loader that reads overrides from `.env` and the process environment
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: EnvSource> ConfigLoader<E> {
    /// Loader that reads overrides from `env` only
    pub fn with_env(env: E) -> Self {
        Self {
            env,
            env_file: None,
        }
    }

    /// Also read overrides from a dotenv file, below those from the environment
    pub fn env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    /// Load and validate the configuration at `path`
    pub fn load(&self, path: impl AsRef<Path>) -> Result<AgentConfig, ConfigError> {
        let path = path.as_ref();

        match self.try_load(path) {
            Ok(config) => {
                info!("Configuration loaded from {}", path.display());
                Ok(config)
            }
            Err(err) => {
                error!(kind = %err.kind(), path = %path.display(), "{err}");
                Err(err)
            }
        }
    }

    fn try_load(&self, path: &Path) -> Result<AgentConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::from_io(path, source))?;

        let document: Value =
            serde_json::from_str(&content).map_err(|source| ConfigError::MalformedInput {
                path: path.to_path_buf(),
                source,
            })?;

        let invalid = |errors| ConfigError::ValidationFailure {
            path: path.to_path_buf(),
            errors,
        };

        let dotenv = match &self.env_file {
            Some(env_file) => {
                EnvFile::load(env_file).map_err(|e| invalid(ValidationErrors::from(e)))?
            }
            None => EnvFile::default(),
        };

        let mut draft = AgentConfig::builder();
        let mut errors = ValidationErrors::new();
        for layer in [
            AgentConfigBuilder::from_env(&dotenv),
            AgentConfigBuilder::from_env(&self.env),
            AgentConfigBuilder::from_json(&document),
        ] {
            match layer {
                Ok(layer) => draft = draft.merge(layer),
                Err(e) => errors.extend(e),
            }
        }
        errors.into_result().map_err(invalid)?;

        draft.build().map_err(invalid)
    }
}

/// Load the configuration at `path`, with overrides from `.env` and the process environment
pub fn load_config(path: impl AsRef<Path>) -> Result<AgentConfig, ConfigError> {
    ConfigLoader::new().load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigErrorKind;
    use crate::parameters::ParamValue;
    use agent_utils::LogCapture;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn no_env() -> ConfigLoader<HashMap<String, String>> {
        ConfigLoader::with_env(HashMap::new())
    }

    fn env(vars: &[(&str, &str)]) -> ConfigLoader<HashMap<String, String>> {
        ConfigLoader::with_env(
            vars.iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let file = write_config("{}");
        let config = no_env().load(file.path()).unwrap();

        assert_eq!(config.name(), "DefaultAgent");
        assert_eq!(config.version(), "1.0");
        assert_eq!(config.log_level(), "INFO");
        assert!(config.parameters().is_empty());
        assert_eq!(config.interval(), Duration::from_secs(1));
        assert_eq!(config, AgentConfig::default());
    }

    #[test]
    fn test_file_values_override_defaults() {
        let file = write_config(r#"{"name": "X", "parameters": {"interval_seconds": 0}}"#);
        let config = no_env().load(file.path()).unwrap();

        assert_eq!(config.name(), "X");
        assert_eq!(config.version(), "1.0");
        assert_eq!(config.interval(), Duration::ZERO);
        assert_eq!(
            config
                .parameters()
                .get("interval_seconds")
                .and_then(ParamValue::as_f64),
            Some(0.0)
        );
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let file = write_config(r#"{"name": "X", "owner": "ops", "replicas": 3}"#);
        let config = no_env().load(file.path()).unwrap();
        assert_eq!(config.name(), "X");
    }

    #[test]
    fn test_null_fields_fall_back_to_defaults() {
        let file = write_config(r#"{"name": null, "parameters": null}"#);
        let config = no_env().load(file.path()).unwrap();
        assert_eq!(config.name(), DEFAULT_NAME);
        assert!(config.parameters().is_empty());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let err = no_env().load(&path).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::NotFound);
        assert_eq!(err.path(), path.as_path());
    }

    #[test]
    fn test_malformed_json() {
        let file = write_config("{not json");
        let err = no_env().load(file.path()).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::MalformedInput);
    }

    #[test]
    fn test_empty_file_is_malformed() {
        let file = write_config("");
        let err = no_env().load(file.path()).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::MalformedInput);
    }

    #[test]
    fn test_invalid_utf8_is_unknown() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x7b, 0xff, 0xfe, 0x7d]).unwrap();

        let err = no_env().load(file.path()).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Unknown);
    }

    #[test]
    fn test_wrong_field_types_are_collected() {
        let file = write_config(r#"{"name": 42, "version": "2", "parameters": [1, 2]}"#);
        let err = no_env().load(file.path()).unwrap_err();

        let ConfigError::ValidationFailure { errors, .. } = &err else {
            panic!("expected validation failure, got {err:?}");
        };
        let fields: Vec<&str> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "parameters"]);
    }

    #[test]
    fn test_top_level_must_be_object() {
        let file = write_config(r#"["name", "X"]"#);
        let err = no_env().load(file.path()).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::ValidationFailure);
        assert!(err.to_string().contains("expected a JSON object, got list"));
    }

    #[test]
    fn test_non_numeric_interval_is_rejected() {
        let file = write_config(r#"{"parameters": {"interval_seconds": "soon"}}"#);
        let err = no_env().load(file.path()).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::ValidationFailure);
        assert!(err.to_string().contains("parameters.interval_seconds"));
    }

    #[test]
    fn test_env_fills_fields_missing_from_file() {
        let file = write_config(r#"{"name": "FromFile"}"#);
        let loader = env(&[
            ("AGENT_NAME", "FromEnv"),
            ("AGENT_LOG_LEVEL", "debug"),
            ("AGENT_PARAMETERS", r#"{"interval_seconds": 0.5, "mode": "env"}"#),
        ]);

        let config = loader.load(file.path()).unwrap();
        assert_eq!(config.name(), "FromFile");
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.version(), DEFAULT_VERSION);
        assert_eq!(config.interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_file_parameters_replace_env_parameters() {
        let file = write_config(r#"{"parameters": {"interval_seconds": 0}}"#);
        let loader = env(&[("AGENT_PARAMETERS", r#"{"interval_seconds": 9, "mode": "env"}"#)]);

        let config = loader.load(file.path()).unwrap();
        assert_eq!(config.interval(), Duration::ZERO);
        assert!(!config.parameters().contains_key("mode"));
    }

    #[test]
    fn test_env_parameters_must_be_object() {
        let file = write_config("{}");
        let loader = env(&[("AGENT_PARAMETERS", "[1, 2]")]);

        let err = loader.load(file.path()).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::ValidationFailure);
        assert!(err.to_string().contains("AGENT_PARAMETERS"));
    }

    #[test]
    fn test_env_parameters_invalid_json() {
        let file = write_config("{}");
        let loader = env(&[("AGENT_PARAMETERS", "{oops")]);

        let err = loader.load(file.path()).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::ValidationFailure);
    }

    #[test]
    fn test_builder_defaults_and_merge() {
        let base = AgentConfig::builder().name("base").version("0.1");
        let top = AgentConfig::builder().name("top");

        let config = base.merge(top).build().unwrap();
        assert_eq!(config.name(), "top");
        assert_eq!(config.version(), "0.1");
        assert_eq!(config.log_level(), DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_builder_rejects_negative_interval() {
        let result = AgentConfig::builder()
            .parameters(Parameters::new().with("interval_seconds", -3_i64))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_env_file_sits_between_defaults_and_environment() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        std::fs::write(
            &env_file,
            "# local overrides\nAGENT_NAME=FromDotEnv\nAGENT_VERSION=0.1\nAGENT_LOG_LEVEL=debug\n",
        )
        .unwrap();
        let file = write_config(r#"{"log_level": "warning"}"#);

        let config = env(&[("AGENT_VERSION", "2.0")])
            .env_file(&env_file)
            .load(file.path())
            .unwrap();
        assert_eq!(config.name(), "FromDotEnv");
        assert_eq!(config.version(), "2.0");
        assert_eq!(config.log_level(), "warning");
    }

    #[test]
    fn test_missing_env_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_config("{}");

        let config = no_env()
            .env_file(dir.path().join(".env"))
            .load(file.path())
            .unwrap();
        assert_eq!(config, AgentConfig::default());
    }

    #[test]
    fn test_unparseable_env_file_is_validation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        std::fs::write(&env_file, "this is not a dotenv line\n").unwrap();
        let file = write_config("{}");

        let err = no_env().env_file(&env_file).load(file.path()).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::ValidationFailure);
        assert!(err.to_string().contains("invalid environment file"));
    }

    #[test]
    fn test_env_key() {
        assert_eq!(env_key(fields::LOG_LEVEL), "AGENT_LOG_LEVEL");
        assert_eq!(env_key(fields::PARAMETERS), "AGENT_PARAMETERS");
    }

    #[test]
    fn test_load_logs_success_and_failure() {
        let capture = LogCapture::new();
        let good = write_config("{}");
        let bad = write_config("{not json");

        tracing::subscriber::with_default(capture.subscriber(), || {
            no_env().load(good.path()).unwrap();
            no_env().load(bad.path()).unwrap_err();
        });

        let lines = capture.lines();
        assert_eq!(lines.len(), 2, "unexpected log output: {lines:#?}");
        assert!(lines[0].contains("INFO"));
        assert!(lines[0].contains("Configuration loaded from"));
        assert!(lines[1].contains("ERROR"));
        assert!(lines[1].contains("kind=MalformedInput"));
        assert!(lines[1].contains(&bad.path().display().to_string()));
    }
}
