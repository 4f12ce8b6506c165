//! Tool descriptors and the callable schema offered to the model.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::schema::ParamType;

/// Schema entry for one exposed parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSchema {
    #[serde(rename = "type")]
    pub json_type: ParamType,
    pub description: String,
}

/// Synthesized metadata for a registered tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    /// `Owner.method` for methods, the declared name for free functions.
    pub name: String,
    pub description: String,
    /// Exposed parameters in declaration order.
    pub parameters: IndexMap<String, ParamSchema>,
    /// Declared required parameters, in declared order.
    pub required: Vec<String>,
    /// Owning type name for methods.
    pub owner: Option<String>,
    /// Output is an artifact shown to the user instead of fed to the model.
    pub artifact: bool,
    /// Every keyword the callable accepts, exposed or not.
    pub accepted: Vec<String>,
}

impl ToolDescriptor {
    /// JSON schema of the keyword arguments.
    pub fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": self.parameters,
            "required": self.required,
        })
    }

    /// Callable schema as exported to the completion service.
    pub fn to_schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.input_schema(),
        }
    }

    pub fn is_method(&self) -> bool {
        self.owner.is_some()
    }
}

/// Tool definition sent to the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}
