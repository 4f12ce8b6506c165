//! Convenience re-exports for common use.

pub use crate::agent::{Orchestrator, OrchestratorSettings, TurnOutcome};
pub use crate::config::StockbotConfig;
pub use crate::display::DisplaySurface;
pub use crate::error::{Result, StockbotError};
pub use crate::provider::{create_provider, ModelProvider};
pub use crate::tools::{
    FunctionTool, ModuleExports, ModuleScanner, Signature, ToolArguments, ToolClass, ToolModule,
    ToolRegistry, ToolSpec,
};
pub use crate::types::{ChatMessage, GenerationSettings, TextStreamDelta, ToolCall, Usage};
