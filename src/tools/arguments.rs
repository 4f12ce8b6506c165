//! Typed access to tool call arguments.

use serde_json::{Map, Value};

use crate::error::{Result, StockbotError};

/// Keyword arguments for one tool invocation.
///
/// Always holds a JSON object; [`ToolArguments::from_blob`] normalises the
/// shapes a completion service may send.
#[derive(Debug, Clone, Default)]
pub struct ToolArguments {
    value: Map<String, Value>,
}

impl ToolArguments {
    pub fn new(value: Map<String, Value>) -> Self {
        Self { value }
    }

    /// Normalise a raw arguments blob.
    ///
    /// Accepts an object, a JSON-encoded string of an object, an empty
    /// string or `null` (no arguments). Anything else is malformed.
    pub fn from_blob(blob: &Value) -> Result<Self> {
        match blob {
            Value::Object(map) => Ok(Self::new(map.clone())),
            Value::Null => Ok(Self::default()),
            Value::String(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Ok(Self::default());
                }
                match serde_json::from_str::<Value>(trimmed) {
                    Ok(Value::Object(map)) => Ok(Self::new(map)),
                    Ok(other) => Err(StockbotError::InvalidArgument(format!(
                        "arguments must be a JSON object, got {}",
                        super::validation::json_type_name(&other)
                    ))),
                    Err(e) => Err(StockbotError::InvalidArgument(format!(
                        "arguments are not valid JSON: {e}"
                    ))),
                }
            }
            other => Err(StockbotError::InvalidArgument(format!(
                "arguments must be a JSON object, got {}",
                super::validation::json_type_name(other)
            ))),
        }
    }

    /// Get the raw JSON object.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.value
    }

    /// The arguments as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.value.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.value.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.value.keys().map(String::as_str)
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str> {
        self.get_str_opt(key)
            .ok_or_else(|| StockbotError::InvalidArgument(format!("Missing string argument: {key}")))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get an integer argument.
    ///
    /// Whole floats (`20.0`) are accepted.
    pub fn get_i64(&self, key: &str) -> Result<i64> {
        self.get_i64_opt(key)
            .ok_or_else(|| StockbotError::InvalidArgument(format!("Missing integer argument: {key}")))
    }

    /// Get an optional integer argument.
    pub fn get_i64_opt(&self, key: &str) -> Option<i64> {
        match self.value.get(key)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            _ => None,
        }
    }

    /// Get a float argument.
    pub fn get_f64(&self, key: &str) -> Result<f64> {
        self.value
            .get(key)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| StockbotError::InvalidArgument(format!("Missing float argument: {key}")))
    }

    /// Get a boolean argument.
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| StockbotError::InvalidArgument(format!("Missing boolean argument: {key}")))
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_value()).map_err(|e| {
            StockbotError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}
