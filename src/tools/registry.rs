//! Tool registry: lookup, schema export, and argument-bound invocation.

use std::panic::AssertUnwindSafe;
use std::path::Path;

use futures::FutureExt;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use super::arguments::ToolArguments;
use super::descriptor::{ToolDescriptor, ToolSchema};
use super::tool::{FunctionTool, ToolClass, ToolTarget};
use super::validation::{reject_unknown, validate_arguments};
use crate::error::{Result, StockbotError};

/// What happens when a qualified name is registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Keep the first registration and report [`StockbotError::DuplicateTool`].
    #[default]
    Reject,
    /// Later registration overwrites the earlier one in place.
    Replace,
}

#[derive(Debug, Clone)]
struct RegisteredTool {
    descriptor: ToolDescriptor,
    target: ToolTarget,
}

/// Qualified name -> descriptor + invocation target, in registration order.
///
/// Built once, then shared read-only (usually as `Arc<ToolRegistry>`).
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    entries: IndexMap<String, RegisteredTool>,
    policy: CollisionPolicy,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: CollisionPolicy) -> Self {
        Self {
            entries: IndexMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    /// Register a free function under its declared name.
    pub fn register_function(&mut self, tool: FunctionTool) -> Result<()> {
        let (descriptor, target) = tool.into_parts();
        self.insert_part(descriptor, target)
    }

    /// Register every method of a class under `TypeName.method`.
    ///
    /// Methods that do not collide are registered even when another one
    /// does; the first collision is returned.
    pub fn register_class(&mut self, class: ToolClass) -> Result<()> {
        let mut first_err = None;
        for (descriptor, target) in class.into_parts() {
            if let Err(e) = self.insert_part(descriptor, target) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub(crate) fn insert_part(&mut self, descriptor: ToolDescriptor, target: ToolTarget) -> Result<()> {
        let name = descriptor.name.clone();
        if self.entries.contains_key(&name) {
            match self.policy {
                CollisionPolicy::Reject => return Err(StockbotError::DuplicateTool(name)),
                CollisionPolicy::Replace => debug!(tool = %name, "replacing registered tool"),
            }
        }
        debug!(tool = %name, method = descriptor.is_method(), "registered tool");
        self.entries.insert(name, RegisteredTool { descriptor, target });
        Ok(())
    }

    /// Callable schemas for every tool, in registration order.
    pub fn export_tool_schemas(&self) -> Vec<ToolSchema> {
        self.entries.values().map(|e| e.descriptor.to_schema()).collect()
    }

    /// Registered qualified names, in registration order.
    pub fn list_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.entries.get(name).map(|e| &e.descriptor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.entries.values().map(|e| &e.descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `name` is a registered artifact tool.
    pub fn is_artifact(&self, name: &str) -> bool {
        self.get(name).is_some_and(|d| d.artifact)
    }

    /// Resolve `name` and call it with the keyword arguments in `blob`.
    ///
    /// Errors are returned, never raised: [`StockbotError::UnknownTool`] for
    /// an unregistered name, [`StockbotError::Invocation`] for a malformed
    /// blob, unknown or missing arguments, type mismatches, a failing tool,
    /// or a panicking tool.
    pub async fn invoke(&self, name: &str, blob: &Value) -> Result<Value> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| StockbotError::UnknownTool(name.to_string()))?;
        let descriptor = &entry.descriptor;

        let args = ToolArguments::from_blob(blob)
            .map_err(|e| StockbotError::invocation(name, e.to_string()))?;
        reject_unknown(args.raw(), &descriptor.accepted)
            .map_err(|msg| StockbotError::invocation(name, msg))?;
        validate_arguments(args.raw(), &descriptor.input_schema())
            .map_err(|msg| StockbotError::invocation(name, msg))?;

        debug!(tool = %name, args = %args.to_value(), "invoking tool");

        let call = std::panic::catch_unwind(AssertUnwindSafe(|| entry.target.call(args)))
            .map_err(|panic| panicked(name, panic))?;

        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e @ StockbotError::Invocation { .. })) => Err(e),
            Ok(Err(e)) => Err(StockbotError::invocation(name, e.to_string())),
            Err(panic) => Err(panicked(name, panic)),
        }
    }

    /// Write every exported schema to `path` as a pretty-printed JSON array.
    pub fn write_schema_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.export_tool_schemas())?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), tools = self.len(), "wrote schema file");
        Ok(())
    }
}

fn panicked(name: &str, panic: Box<dyn std::any::Any + Send>) -> StockbotError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    warn!(tool = %name, panic = %message, "tool panicked");
    StockbotError::invocation(name, format!("tool panicked: {message}"))
}
