//! Conversation orchestrator: one user turn from input to answer.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bon::Builder;
use futures::StreamExt;
use serde_json::json;
use tracing::{debug, error, warn};

use crate::config::StockbotConfig;
use crate::display::DisplaySurface;
use crate::error::{Result, StockbotError};
use crate::provider::format::tool_result_to_string;
use crate::provider::{ModelProvider, ProviderRequest, ProviderResponse};
use crate::tools::ToolRegistry;
use crate::types::{ChatMessage, GenerationSettings, StreamEventType, ToolCall, Usage};
use crate::util::retry::RetryPolicy;
use crate::util::timeout::with_timeout;

use super::conversation::Conversation;

/// Notice shown to the user when a turn fails.
pub const DEFAULT_FAILURE_NOTICE: &str =
    "An error occurred while processing your request. Please try again.";

/// Per-session turn settings.
#[derive(Debug, Clone, Builder)]
pub struct OrchestratorSettings {
    /// Prepended to every request; not stored in the conversation.
    #[builder(into)]
    pub system_prompt: Option<String>,
    /// Stream the summarizing answer fragment by fragment.
    #[builder(default = true)]
    pub stream: bool,
    /// Upper bound on one tool invocation.
    #[builder(default = Duration::from_secs(60))]
    pub tool_timeout: Duration,
    /// Applied to every completion-service call.
    #[builder(default)]
    pub retry: RetryPolicy,
    #[builder(into, default = DEFAULT_FAILURE_NOTICE.to_string())]
    pub failure_notice: String,
    #[builder(default)]
    pub generation: GenerationSettings,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &StockbotConfig) -> Self {
        Self::builder()
            .maybe_system_prompt(config.system_prompt.clone())
            .stream(config.stream)
            .tool_timeout(config.tool_timeout)
            .build()
    }
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A final assistant answer was produced and stored.
    Answered(String),
    /// Only artifact tools ran; their outputs went to the display.
    ArtifactsOnly(Vec<PathBuf>),
    /// The completion service failed; a notice was shown.
    Failed,
}

/// Drives the tool-calling loop for one session.
///
/// Owns the conversation; shares the provider and the read-only registry.
pub struct Orchestrator {
    provider: Arc<dyn ModelProvider>,
    registry: Arc<ToolRegistry>,
    settings: OrchestratorSettings,
    conversation: Conversation,
    usage: Usage,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        registry: Arc<ToolRegistry>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            provider,
            registry,
            settings,
            conversation: Conversation::new(),
            usage: Usage::default(),
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Token usage accumulated over the session.
    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    /// Run one user turn to completion.
    ///
    /// Never returns an error: completion-service failures end the turn with
    /// [`TurnOutcome::Failed`] and a notice on `display`; tool failures are
    /// recorded in the conversation as error results.
    pub async fn handle_turn(&mut self, input: &str, display: &mut dyn DisplaySurface) -> TurnOutcome {
        self.conversation.add_user_message(input);

        let tools = self.registry.export_tool_schemas();
        let request = self.request(if tools.is_empty() { None } else { Some(tools) });

        let response = match self.complete(&request).await {
            Ok(response) => response,
            Err(e) => return self.fail(display, "completion request failed", &e),
        };

        if !response.has_tool_calls() {
            self.conversation.add_assistant_message(&response.text);
            display.show_text(&response.text);
            return TurnOutcome::Answered(response.text);
        }

        let model_calls: Vec<ToolCall> = response
            .tool_calls
            .iter()
            .filter(|call| !self.registry.is_artifact(&call.name))
            .cloned()
            .collect();
        let only_artifacts = model_calls.is_empty();

        if !only_artifacts {
            self.conversation.push(ChatMessage::assistant_with_calls(
                Some(response.text.clone()),
                model_calls,
            ));
        }

        let mut artifacts = Vec::new();
        for call in &response.tool_calls {
            if self.registry.is_artifact(&call.name) {
                if let Some(path) = self.run_artifact(call, display).await {
                    artifacts.push(path);
                }
            } else {
                let message = self.run_tool(call).await;
                self.conversation.push(message);
            }
        }

        if only_artifacts {
            return TurnOutcome::ArtifactsOnly(artifacts);
        }

        match self.summarize(display).await {
            Ok(text) => {
                self.conversation.add_assistant_message(&text);
                TurnOutcome::Answered(text)
            }
            Err(e) => self.fail(display, "summary request failed", &e),
        }
    }

    fn request(&self, tools: Option<Vec<crate::tools::ToolSchema>>) -> ProviderRequest {
        let mut messages = Vec::with_capacity(self.conversation.len() + 1);
        if let Some(ref sys) = self.settings.system_prompt {
            messages.push(ChatMessage::system(sys.clone()));
        }
        messages.extend(self.conversation.messages().iter().cloned());

        ProviderRequest {
            messages,
            tools,
            settings: self.settings.generation.clone(),
        }
    }

    async fn complete(&mut self, request: &ProviderRequest) -> Result<ProviderResponse> {
        let provider = Arc::clone(&self.provider);
        let response = self
            .settings
            .retry
            .execute(|| provider.generate_text(request))
            .await?;
        self.record_usage(&response.usage);
        Ok(response)
    }

    /// Follow-up request without tools; streamed when enabled.
    async fn summarize(&mut self, display: &mut dyn DisplaySurface) -> Result<String> {
        let request = self.request(None);

        if !self.settings.stream {
            let response = self.complete(&request).await?;
            display.show_text(&response.text);
            return Ok(response.text);
        }

        let provider = Arc::clone(&self.provider);
        let mut stream = self
            .settings
            .retry
            .execute(|| provider.stream_text(&request))
            .await?;

        let mut text = String::new();
        while let Some(delta) = stream.next().await {
            let delta = match delta {
                Ok(delta) => delta,
                Err(e) => {
                    display.finish_stream();
                    return Err(e);
                }
            };
            if !delta.text.is_empty() {
                display.show_fragment(&delta.text);
                text.push_str(&delta.text);
            }
            if let Some(ref usage) = delta.usage {
                self.record_usage(usage);
            }
            if delta.event_type == StreamEventType::Done {
                debug!(finish_reason = ?delta.finish_reason, "stream finished");
            }
        }
        display.finish_stream();
        Ok(text)
    }

    /// Invoke a model-facing tool and turn the outcome into a `tool` message.
    async fn run_tool(&self, call: &ToolCall) -> ChatMessage {
        match self.invoke(call).await {
            Ok(value) => ChatMessage::tool_result(&call.id, &call.name, tool_result_to_string(&value)),
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, "tool call failed");
                let content = json!({ "error": e.to_string() }).to_string();
                ChatMessage::tool_error(&call.id, &call.name, content)
            }
        }
    }

    /// Invoke an artifact tool and hand its output path to the display.
    async fn run_artifact(&self, call: &ToolCall, display: &mut dyn DisplaySurface) -> Option<PathBuf> {
        match self.invoke(call).await {
            Ok(value) => {
                let path = PathBuf::from(artifact_path(&value));
                display.show_artifact(&path);
                Some(path)
            }
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, "artifact tool failed");
                display.show_notice(&self.settings.failure_notice);
                None
            }
        }
    }

    async fn invoke(&self, call: &ToolCall) -> Result<serde_json::Value> {
        with_timeout(
            self.settings.tool_timeout,
            self.registry.invoke(&call.name, &call.arguments),
        )
        .await
        .map_err(|e| match e {
            StockbotError::Timeout(ms) => {
                StockbotError::invocation(&call.name, format!("timed out after {ms} ms"))
            }
            other => other,
        })
    }

    fn record_usage(&mut self, usage: &Usage) {
        self.usage.merge(usage);
        debug!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            session_total = self.usage.total_tokens,
            "token usage"
        );
    }

    fn fail(&self, display: &mut dyn DisplaySurface, context: &str, e: &StockbotError) -> TurnOutcome {
        error!(error = %e, category = ?e.category(), "{context}");
        display.show_notice(&self.settings.failure_notice);
        TurnOutcome::Failed
    }
}

/// Artifact tools return a path, either bare or as `{"path": ...}`.
fn artifact_path(value: &serde_json::Value) -> String {
    value
        .get("path")
        .and_then(|p| p.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| tool_result_to_string(value))
}
