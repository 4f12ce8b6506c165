//! Formatting helpers shared by the provider and the orchestrator.

use std::collections::HashMap;

use serde_json::Value;

use crate::tools::ToolSchema;

pub const WIRE_SEPARATOR: &str = "__";

/// Convert a tool result JSON value into a string payload for providers.
pub fn tool_result_to_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(v) => v.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Encode a qualified tool name for the wire.
///
/// Function names on chat-completion APIs must match `^[a-zA-Z0-9_-]+$`, so
/// `StockAnalyzer.get_stock_price` is sent as `StockAnalyzer__get_stock_price`.
pub fn encode_tool_name(name: &str) -> String {
    name.replace('.', WIRE_SEPARATOR)
}

/// Reverse lookup from wire names to qualified names for one request.
#[derive(Debug, Default, Clone)]
pub struct ToolNameCodec {
    by_wire: HashMap<String, String>,
}

impl ToolNameCodec {
    pub fn new(tools: &[ToolSchema]) -> Self {
        let by_wire = tools
            .iter()
            .map(|t| (encode_tool_name(&t.name), t.name.clone()))
            .collect();
        Self { by_wire }
    }

    /// Decode a wire name. Names that were never offered pass through unchanged.
    pub fn decode(&self, wire: &str) -> String {
        self.by_wire
            .get(wire)
            .cloned()
            .unwrap_or_else(|| wire.to_string())
    }
}
