//! Error types for stockbot.

use thiserror::Error;

/// Primary error type for all stockbot operations.
#[derive(Error, Debug)]
pub enum StockbotError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Schema error in tool '{tool}': {message}")]
    Schema { tool: String, message: String },

    #[error("Failed to load tool module '{module}': {message}")]
    ModuleLoad { module: String, message: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Invocation of '{tool}' failed: {message}")]
    Invocation { tool: String, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Coarse classification used for retry decisions and log routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    Registry,
    ToolExecution,
    Unknown,
}

impl StockbotError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a schema error for a tool declaration.
    pub fn schema(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create an invocation error for a tool call.
    pub fn invocation(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invocation {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::Schema { .. }
            | Self::ModuleLoad { .. }
            | Self::UnknownTool(_)
            | Self::DuplicateTool(_) => ErrorCategory::Registry,
            Self::Invocation { .. } => ErrorCategory::ToolExecution,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, StockbotError>;
