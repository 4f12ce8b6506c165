//! Completion-service provider trait and the OpenAI-compatible implementation.

pub mod format;
pub mod http;
pub mod openai;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::config::StockbotConfig;
use crate::error::{Result, StockbotError};
use crate::tools::ToolSchema;
use crate::types::{ChatMessage, FinishReason, GenerationSettings, TextStreamDelta, ToolCall, Usage};

pub use openai::OpenAiCompatibleProvider;

/// A request sent to the completion service.
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    pub messages: Vec<ChatMessage>,
    /// Tools offered to the model. `None` forces a plain-text answer.
    pub tools: Option<Vec<ToolSchema>>,
    pub settings: GenerationSettings,
}

/// Response from the completion service.
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
    pub finish_reason: Option<FinishReason>,
}

impl ProviderResponse {
    /// Whether the model asked for tool invocations instead of answering.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Core trait implemented by completion-service clients.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "openai-compatible").
    fn provider_name(&self) -> &str;
    /// The model ID this provider instance serves.
    fn model_id(&self) -> &str;

    /// Generate a response (non-streaming). May contain tool calls.
    async fn generate_text(&self, request: &ProviderRequest) -> Result<ProviderResponse>;

    /// Generate text (streaming).
    async fn stream_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta>>>;
}

/// Create the completion-service provider from configuration.
///
/// This is the only place where missing `BASE_URL`/`API_KEY` is fatal.
pub fn create_provider(config: &StockbotConfig) -> Result<Box<dyn ModelProvider>> {
    let base_url = config
        .base_url()
        .ok_or_else(|| StockbotError::Configuration("Missing BASE_URL".into()))?;
    let api_key = config
        .api_key()
        .ok_or_else(|| StockbotError::Authentication("Missing API_KEY".into()))?;

    let provider = OpenAiCompatibleProvider::new(
        config.model.clone(),
        api_key.to_string(),
        base_url.to_string(),
        config.request_timeout,
    )?;
    Ok(Box::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_provider_requires_base_url() {
        let config = StockbotConfig::new().with_api_key("sk-test");
        let err = create_provider(&config).err().unwrap();
        assert!(matches!(err, StockbotError::Configuration(_)));
    }

    #[test]
    fn create_provider_requires_api_key() {
        let config = StockbotConfig::new().with_base_url("http://localhost:11434/v1");
        let err = create_provider(&config).err().unwrap();
        assert!(matches!(err, StockbotError::Authentication(_)));
    }

    #[test]
    fn create_provider_uses_configured_model() {
        let config = StockbotConfig::new()
            .with_base_url("http://localhost:11434/v1")
            .with_api_key("ollama")
            .with_model("llama3.1:8b");
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_id(), "llama3.1:8b");
        assert_eq!(provider.provider_name(), "openai-compatible");
    }
}
