//! Validate tool call arguments against a tool's parameter schema.

use serde_json::{Map, Value};

/// Validate keyword arguments against a JSON object schema.
///
/// Checks required field presence and property types. Returns `Ok(())`
/// when valid, `Err(message)` describing the first violation found.
/// Keys absent from `properties` are left to [`reject_unknown`].
pub fn validate_arguments(args: &Map<String, Value>, schema: &Value) -> Result<(), String> {
    if let Some(required) = schema.get("required").and_then(|v| v.as_array()) {
        for field in required {
            if let Some(name) = field.as_str() {
                if !args.contains_key(name) {
                    return Err(format!("missing required argument '{name}'"));
                }
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(|v| v.as_object()) {
        for (key, value) in args {
            if let Some(prop_schema) = properties.get(key) {
                if let Some(expected_type) = prop_schema.get("type").and_then(|v| v.as_str()) {
                    if !value_matches_type(value, expected_type) {
                        return Err(format!(
                            "argument '{}' expected type '{}', got {}",
                            key,
                            expected_type,
                            json_type_name(value)
                        ));
                    }
                }
            }
        }
    }

    Ok(())
}

/// Reject keyword arguments the callable does not accept.
pub fn reject_unknown(args: &Map<String, Value>, accepted: &[String]) -> Result<(), String> {
    let mut unknown: Vec<&str> = args
        .keys()
        .filter(|k| !accepted.iter().any(|a| a == *k))
        .map(String::as_str)
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    unknown.sort_unstable();
    Err(format!("unexpected keyword argument(s): {}", unknown.join(", ")))
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => {
            value.is_i64()
                || value.is_u64()
                || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
