//! Shared test helpers: scripted mock provider and fixture tool modules.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::json;

use stockbot::error::{Result, StockbotError};
use stockbot::provider::{ModelProvider, ProviderRequest, ProviderResponse};
use stockbot::tools::{
    FnModule, FunctionTool, ModuleExports, Signature, ToolArguments, ToolClass, ToolModule,
    ToolSpec,
};
use stockbot::types::*;
use stockbot::util::retry::RetryPolicy;

enum Scripted {
    Response(ProviderResponse),
    Error(StockbotError),
    /// Streams `text` and then fails with `error`.
    BrokenStream { text: String, error: StockbotError },
}

/// A provider that replays a script and records every request it sees.
pub struct MockProvider {
    model_id: String,
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockProvider {
    pub fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a text response.
    pub fn queue_response(&self, text: &str) {
        self.push(Scripted::Response(ProviderResponse {
            text: text.to_string(),
            tool_calls: vec![],
            usage: Usage {
                input_tokens: 10,
                output_tokens: 20,
                total_tokens: 30,
            },
            finish_reason: Some(FinishReason::Stop),
        }));
    }

    /// Queue a tool call response.
    pub fn queue_tool_call(&self, id: &str, name: &str, args: serde_json::Value) {
        self.queue_tool_calls(vec![ToolCall::new(id, name, args)]);
    }

    /// Queue a response requesting several tool calls.
    pub fn queue_tool_calls(&self, calls: Vec<ToolCall>) {
        self.push(Scripted::Response(ProviderResponse {
            text: String::new(),
            tool_calls: calls,
            usage: Usage {
                input_tokens: 10,
                output_tokens: 5,
                total_tokens: 15,
            },
            finish_reason: Some(FinishReason::ToolCalls),
        }));
    }

    /// Queue a failure.
    pub fn queue_error(&self, err: StockbotError) {
        self.push(Scripted::Error(err));
    }

    /// Queue a stream that yields `text` and then fails partway through.
    /// A non-streaming call consuming it fails straight away.
    pub fn queue_broken_stream(&self, text: &str, err: StockbotError) {
        self.push(Scripted::BrokenStream {
            text: text.to_string(),
            error: err,
        });
    }

    fn push(&self, item: Scripted) {
        self.script.lock().unwrap().push_back(item);
    }

    fn pop(&self, request: &ProviderRequest) -> Scripted {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockProvider script exhausted")
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate_text(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        match self.pop(request) {
            Scripted::Response(response) => Ok(response),
            Scripted::Error(err) | Scripted::BrokenStream { error: err, .. } => Err(err),
        }
    }

    async fn stream_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta>>> {
        let (text, failure) = match self.pop(request) {
            Scripted::Response(response) => (response.text, None),
            Scripted::Error(err) => return Err(err),
            Scripted::BrokenStream { text, error } => (text, Some(error)),
        };

        let stream = async_stream::stream! {
            for chunk in text.chars().collect::<Vec<_>>().chunks(5) {
                yield Ok(TextStreamDelta::text(chunk.iter().collect::<String>()));
            }
            if let Some(err) = failure {
                yield Err(err);
                return;
            }
            yield Ok(TextStreamDelta::done(
                Some(FinishReason::Stop),
                Some(Usage { input_tokens: 10, output_tokens: 20, total_tokens: 30 }),
            ));
        };

        Ok(Box::pin(stream))
    }
}

/// Retry policy with near-zero backoff for tests.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(1),
        multiplier: 1.0,
    }
}

/// Fixed-price stand-in for the analyzer class.
pub struct FakeAnalyzer;

impl FakeAnalyzer {
    fn price(ticker: &str) -> Option<f64> {
        match ticker {
            "AAPL" => Some(189.5),
            "MSFT" => Some(415.25),
            _ => None,
        }
    }
}

/// Module with a `StockAnalyzer` class (two methods) and no network access.
pub fn analyzer_module() -> Box<dyn ToolModule> {
    Box::new(FnModule::new("stock_analysis", || {
        let class = ToolClass::new("StockAnalyzer", FakeAnalyzer)
            .method(
                ToolSpec::new(
                    "get_stock_price",
                    "Gets the latest stock price given the ticker symbol of a company.",
                )
                .required(["ticker"])
                .doc(":param ticker: The stock ticker symbol for a company (for example AAPL for Apple)")
                .signature(Signature::method().param::<str>("ticker")),
                |_this: Arc<FakeAnalyzer>, args: ToolArguments| async move {
                    let ticker = args.get_str("ticker")?;
                    FakeAnalyzer::price(ticker)
                        .map(|p| json!(p.to_string()))
                        .ok_or_else(|| StockbotError::InvalidArgument(format!("no data for {ticker}")))
                },
            )?
            .method(
                ToolSpec::new("calculate_SMA", "Calculate the simple moving average.")
                    .required(["ticker", "window"])
                    .signature(Signature::method().param::<str>("ticker").param::<u32>("window")),
                |_this: Arc<FakeAnalyzer>, args: ToolArguments| async move {
                    let ticker = args.get_str("ticker")?;
                    let window = args.get_i64("window")?;
                    Ok(json!(format!("{ticker} SMA({window}) = 180.0")))
                },
            )?;
        Ok(ModuleExports::new().class(class))
    }))
}

/// Module with an artifact tool that "plots" by returning a fixed path.
pub fn plotter_module(path: PathBuf) -> Box<dyn ToolModule> {
    Box::new(FnModule::new("stock_plotter", move || {
        let path = path.clone();
        let class = ToolClass::new("StockPlotter", ()).method(
            ToolSpec::new("plot_stock_price", "Plot the stock price for the last year.")
                .required(["ticker"])
                .artifact()
                .signature(Signature::method().param::<str>("ticker")),
            move |_this: Arc<()>, args: ToolArguments| {
                let path = path.clone();
                async move {
                    args.get_str("ticker")?;
                    Ok(json!(path.display().to_string()))
                }
            },
        )?;
        Ok(ModuleExports::new().class(class))
    }))
}

/// Module with a free function.
pub fn news_module() -> Box<dyn ToolModule> {
    Box::new(FnModule::new("news_analyst", || {
        let function = FunctionTool::new(
            ToolSpec::new("get_news", "Get the latest news for a stock.")
                .required(["stock"])
                .signature(Signature::function().param::<str>("stock")),
            |args: ToolArguments| async move {
                let stock = args.get_str("stock")?;
                Ok(json!([{ "title": format!("{stock} beats estimates"), "url": "https://example.test/1" }]))
            },
        )?;
        Ok(ModuleExports::new().function(function))
    }))
}
