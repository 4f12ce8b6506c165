//! OpenAI-compatible Chat Completions provider.
//!
//! Works against any endpoint speaking the `/chat/completions` dialect
//! (OpenAI, Ollama, LM Studio, vLLM, ...).

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{Result, StockbotError};
use crate::types::*;

use super::format::{encode_tool_name, ToolNameCodec};
use super::http::{bearer_headers, build_client, parse_sse_data, status_to_error, SseLineBuffer};
use super::{ModelProvider, ProviderRequest, ProviderResponse};

pub struct OpenAiCompatibleProvider {
    model_id: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        model_id: String,
        api_key: String,
        base_url: String,
        request_timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            model_id,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client(request_timeout)?,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request_body(&self, request: &ProviderRequest, stream: bool) -> Value {
        let messages = request
            .messages
            .iter()
            .map(message_to_openai)
            .collect::<Vec<_>>();

        let mut obj = Map::new();
        obj.insert("model".into(), self.model_id.clone().into());
        obj.insert("messages".into(), messages.into());
        obj.insert("stream".into(), stream.into());

        if let Some(max) = request.settings.max_tokens {
            obj.insert("max_tokens".into(), max.into());
        }
        if let Some(temp) = request.settings.temperature {
            obj.insert("temperature".into(), temp.into());
        }
        if let Some(top_p) = request.settings.top_p {
            obj.insert("top_p".into(), top_p.into());
        }
        if let Some(seed) = request.settings.seed {
            obj.insert("seed".into(), seed.into());
        }

        if let Some(ref tools) = request.tools {
            if !tools.is_empty() {
                let tool_defs: Vec<Value> = tools
                    .iter()
                    .map(|t| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": encode_tool_name(&t.name),
                                "description": t.description,
                                "parameters": t.parameters,
                            }
                        })
                    })
                    .collect();
                obj.insert("tools".into(), tool_defs.into());
                obj.insert("tool_choice".into(), "auto".into());
            }
        }

        Value::Object(obj)
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response> {
        let resp = self
            .client
            .post(self.endpoint())
            .headers(bearer_headers(&self.api_key))
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), &body_text));
        }
        Ok(resp)
    }
}

#[async_trait]
impl ModelProvider for OpenAiCompatibleProvider {
    fn provider_name(&self) -> &str {
        "openai-compatible"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate_text(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        let body = self.build_request_body(request, false);
        let codec = ToolNameCodec::new(request.tools.as_deref().unwrap_or_default());

        debug!(
            model = %self.model_id,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "chat completion"
        );

        let data: OpenAiChatResponse = self.post(&body).await?.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| StockbotError::api(200, "No choices in completion response"))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: codec.decode(&tc.function.name),
                arguments: serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(Value::String(tc.function.arguments)),
            })
            .collect();

        let finish_reason = choice.finish_reason.as_deref().and_then(parse_finish_reason);

        Ok(ProviderResponse {
            text: choice.message.content.unwrap_or_default(),
            tool_calls,
            usage: data.usage.map(Usage::from).unwrap_or_default(),
            finish_reason,
        })
    }

    async fn stream_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta>>> {
        let body = self.build_request_body(request, true);

        debug!(model = %self.model_id, messages = request.messages.len(), "chat completion stream");

        let byte_stream = self.post(&body).await?.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer = SseLineBuffer::new();
            futures::pin_mut!(byte_stream);

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(StockbotError::Network(e));
                        break;
                    }
                };

                buffer.extend(&chunk);

                while let Some(line) = buffer.next_line() {
                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }
                    if line == "data: [DONE]" || line == "data:[DONE]" {
                        yield Ok(TextStreamDelta::done(None, None));
                        return;
                    }

                    let Some(data) = parse_sse_data(&line) else {
                        continue;
                    };
                    match serde_json::from_str::<OpenAiStreamChunk>(data) {
                        Ok(chunk) => {
                            let usage = chunk.usage.map(Usage::from);
                            match chunk.choices.into_iter().next() {
                                Some(choice) => {
                                    let text = choice.delta.content.unwrap_or_default();
                                    let finish = choice.finish_reason.as_deref().and_then(parse_finish_reason);
                                    let event_type = if finish.is_some() {
                                        StreamEventType::Done
                                    } else {
                                        StreamEventType::TextDelta
                                    };
                                    yield Ok(TextStreamDelta {
                                        text,
                                        event_type,
                                        finish_reason: finish,
                                        usage,
                                    });
                                }
                                None if usage.is_some() => {
                                    yield Ok(TextStreamDelta::done(None, usage));
                                }
                                None => {}
                            }
                        }
                        Err(e) => debug!(error = %e, "skipping unparseable stream chunk"),
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

fn parse_finish_reason(s: &str) -> Option<FinishReason> {
    match s {
        "stop" => Some(FinishReason::Stop),
        "length" => Some(FinishReason::Length),
        "tool_calls" | "function_call" => Some(FinishReason::ToolCalls),
        "content_filter" => Some(FinishReason::ContentFilter),
        _ => None,
    }
}

fn arguments_to_wire(arguments: &Value) -> String {
    match arguments {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn message_to_openai(msg: &ChatMessage) -> Value {
    match msg {
        ChatMessage::System { content }
        | ChatMessage::User { content }
        | ChatMessage::Assistant { content } => {
            json!({ "role": msg.role(), "content": content })
        }
        ChatMessage::AssistantWithCalls {
            content,
            tool_calls,
        } => {
            let tc_json: Vec<Value> = tool_calls
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": encode_tool_name(&tc.name),
                            "arguments": arguments_to_wire(&tc.arguments),
                        }
                    })
                })
                .collect();
            json!({
                "role": "assistant",
                "content": content,
                "tool_calls": tc_json,
            })
        }
        ChatMessage::Tool {
            tool_call_id,
            name,
            content,
            ..
        } => json!({
            "role": "tool",
            "tool_call_id": tool_call_id,
            "name": encode_tool_name(name),
            "content": content,
        }),
    }
}

// Chat Completions response types (internal)

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunction,
}

#[derive(Deserialize)]
struct OpenAiFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<OpenAiUsage> for Usage {
    fn from(u: OpenAiUsage) -> Self {
        Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[derive(Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiStreamDelta {
    content: Option<String>,
}
