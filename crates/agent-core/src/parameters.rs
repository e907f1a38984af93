//! Free-form agent parameters
//!
//! `Parameters` is the loosely typed bag from the `parameters` section of the
//! configuration file. Values are kept as a tagged [`ParamValue`] so callers
//! extract what they need with an explicit type check instead of relying on
//! coercion.

use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::error::FieldError;

/// Key holding the delay between placeholder tasks, in seconds
pub const INTERVAL_SECONDS: &str = "interval_seconds";

/// Delay used when `interval_seconds` is not set
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// JSON `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Integer or floating point number
    Number(Number),
    /// UTF-8 string
    String(String),
    /// Ordered list of values
    List(Vec<ParamValue>),
    /// Nested mapping
    Map(Parameters),
}

impl ParamValue {
    /// Human-readable name of the variant, used in validation messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "mapping",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Parameters> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(Parameters::from(map)),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

/// Mapping from parameter name to value
///
/// Keys are kept sorted, so rendering is stable regardless of the order they
/// appeared in the source document.
///
/// # Example
///
/// ```
/// use agent_core::Parameters;
///
/// let params = Parameters::new()
///     .with("interval_seconds", 0_u64)
///     .with("mode", "fast");
///
/// assert_eq!(params.get("mode").and_then(|v| v.as_str()), Some("fast"));
/// assert_eq!(params.to_string(), r#"{"interval_seconds":0,"mode":"fast"}"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, ParamValue>);

impl Parameters {
    /// Create an empty parameter bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Delay between placeholder tasks
    ///
    /// Absent means [`DEFAULT_INTERVAL`]. A present value must be a
    /// non-negative number of seconds that fits in a `Duration`; anything
    /// else is rejected.
    pub fn interval(&self) -> Result<Duration, FieldError> {
        let Some(value) = self.get(INTERVAL_SECONDS) else {
            return Ok(DEFAULT_INTERVAL);
        };
        let field = format!("parameters.{INTERVAL_SECONDS}");

        let seconds = value.as_f64().ok_or_else(|| {
            FieldError::new(
                &field,
                format!("expected a number of seconds, got {}", value.type_name()),
            )
        })?;

        if seconds < 0.0 {
            return Err(FieldError::new(
                &field,
                format!("expected a non-negative number of seconds, got {seconds}"),
            ));
        }

        Duration::try_from_secs_f64(seconds)
            .map_err(|e| FieldError::new(&field, format!("{e}, got {seconds}")))
    }
}

impl From<Map<String, Value>> for Parameters {
    fn from(map: Map<String, Value>) -> Self {
        Self(
            map.into_iter()
                .map(|(key, value)| (key, ParamValue::from(value)))
                .collect(),
        )
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
