//! Function-calling tool registry.
//!
//! Tools are declared with a [`ToolSpec`], paired with a handler as a
//! [`FunctionTool`] or a method on a [`ToolClass`], grouped into
//! [`ToolModule`]s, and assembled by the [`ModuleScanner`] into a
//! [`ToolRegistry`].

pub mod arguments;
pub mod descriptor;
pub mod module;
pub mod registry;
pub mod schema;
pub mod spec;
pub mod tool;
pub mod validation;

pub use arguments::ToolArguments;
pub use descriptor::{ParamSchema, ToolDescriptor, ToolSchema};
pub use module::{FnModule, ModuleExports, ModuleScanner, ScanReport, ToolModule};
pub use registry::{CollisionPolicy, ToolRegistry};
pub use schema::{parse_param_docs, synthesize, CallableKind, JsonType, Param, ParamType, Signature};
pub use spec::ToolSpec;
pub use tool::{FunctionTool, OwnerRef, ToolClass, ToolFuture, ToolTarget};
