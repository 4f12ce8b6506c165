//! Message types for model communication.

use serde::{Deserialize, Serialize};

/// A message in a conversation.
///
/// Serialized with a `role` tag so a transcript dump reads like the
/// chat-completion wire format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
    },
    /// Assistant turn that requested tool invocations.
    AssistantWithCalls {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    /// Result of one tool invocation, correlated by call id.
    Tool {
        tool_call_id: String,
        name: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::System {
            content: text.into(),
        }
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::User {
            content: text.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant {
            content: text.into(),
        }
    }

    /// Create an assistant message carrying tool calls.
    pub fn assistant_with_calls(text: Option<String>, calls: Vec<ToolCall>) -> Self {
        Self::AssistantWithCalls {
            content: text.filter(|t| !t.is_empty()),
            tool_calls: calls,
        }
    }

    /// Create a successful tool result message.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error tool result message.
    pub fn tool_error(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            content: content.into(),
            is_error: true,
        }
    }

    /// Wire role name.
    pub fn role(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::User { .. } => "user",
            Self::Assistant { .. } | Self::AssistantWithCalls { .. } => "assistant",
            Self::Tool { .. } => "tool",
        }
    }

    /// Text content, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::System { content }
            | Self::User { content }
            | Self::Assistant { content }
            | Self::Tool { content, .. } => Some(content),
            Self::AssistantWithCalls { content, .. } => content.as_deref(),
        }
    }

    /// Tool calls requested by this message (empty unless `AssistantWithCalls`).
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::AssistantWithCalls { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Arguments blob; an object, or a JSON-encoded string of one.
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}
