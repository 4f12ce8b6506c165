//! The `StockAnalyzer` tool class: latest price, technical indicators and
//! key financial ratios.

use std::sync::Arc;

use serde_json::json;

use stockbot::error::{Result, StockbotError};
use stockbot::tools::{Signature, ToolArguments, ToolClass, ToolSpec};

use crate::fundamentals::{FinancialMetrics, FundamentalsSource};
use crate::indicators::{self, DEFAULT_RSI_WINDOW};
use crate::market::PriceSource;

const TICKER_DOC: &str =
    ":param ticker: The stock ticker symbol for a company (for example AAPL for Apple)";

/// Price lookups and indicators over one year of daily closes.
pub struct StockAnalyzer {
    source: Arc<dyn PriceSource>,
    fundamentals: Arc<dyn FundamentalsSource>,
}

impl StockAnalyzer {
    pub fn new(source: Arc<dyn PriceSource>, fundamentals: Arc<dyn FundamentalsSource>) -> Self {
        Self {
            source,
            fundamentals,
        }
    }

    /// Latest close, as text.
    pub async fn stock_price(&self, ticker: &str) -> Result<String> {
        let history = self.source.history(ticker).await?;
        history
            .last_close()
            .map(|close| close.to_string())
            .ok_or_else(|| no_data(ticker))
    }

    pub async fn sma(&self, ticker: &str, window: usize) -> Result<f64> {
        let closes = self.closes(ticker).await?;
        indicators::sma(&closes, window).ok_or_else(|| too_short(ticker, window, closes.len()))
    }

    pub async fn ema(&self, ticker: &str, window: usize) -> Result<f64> {
        let closes = self.closes(ticker).await?;
        indicators::ema(&closes, window).ok_or_else(|| no_data(ticker))
    }

    pub async fn rsi(&self, ticker: &str, window: usize) -> Result<f64> {
        let closes = self.closes(ticker).await?;
        indicators::rsi(&closes, window).ok_or_else(|| too_short(ticker, 2, closes.len()))
    }

    pub async fn macd(&self, ticker: &str) -> Result<indicators::Macd> {
        let closes = self.closes(ticker).await?;
        indicators::macd(&closes).ok_or_else(|| no_data(ticker))
    }

    pub async fn financial_metrics(&self, ticker: &str) -> Result<FinancialMetrics> {
        self.fundamentals.financial_metrics(ticker).await
    }

    async fn closes(&self, ticker: &str) -> Result<Vec<f64>> {
        Ok(self.source.history(ticker).await?.closes())
    }

    /// Expose the analyzer as a tool class named `StockAnalyzer`.
    pub fn into_tool_class(self) -> Result<ToolClass> {
        ToolClass::new("StockAnalyzer", self)
            .method(
                ToolSpec::new(
                    "get_stock_price",
                    "Gets the latest stock price given the ticker symbol of a company.",
                )
                .required(["ticker"])
                .doc(TICKER_DOC)
                .signature(ticker_signature()),
                |this: Arc<StockAnalyzer>, args: ToolArguments| async move {
                    Ok(json!(this.stock_price(args.get_str("ticker")?).await?))
                },
            )?
            .method(
                ToolSpec::new(
                    "calculate_SMA",
                    "Calculate the simple moving average for a given stock ticker and a window.",
                )
                .required(["ticker", "window"])
                .doc(window_doc("The timeframe to consider when calculating the SMA"))
                .signature(ticker_signature().param::<u32>("window")),
                |this: Arc<StockAnalyzer>, args: ToolArguments| async move {
                    let window = window(&args, None)?;
                    Ok(json!(this.sma(args.get_str("ticker")?, window).await?))
                },
            )?
            .method(
                ToolSpec::new(
                    "calculate_EMA",
                    "Calculate the exponential moving average for a given stock ticker and a window.",
                )
                .required(["ticker", "window"])
                .doc(window_doc("The span of the exponential moving average"))
                .signature(ticker_signature().param::<u32>("window")),
                |this: Arc<StockAnalyzer>, args: ToolArguments| async move {
                    let window = window(&args, None)?;
                    Ok(json!(this.ema(args.get_str("ticker")?, window).await?))
                },
            )?
            .method(
                ToolSpec::new(
                    "calculate_RSI",
                    "Calculate the relative strength index for a given stock ticker.",
                )
                .required(["ticker"])
                .doc(window_doc("The RSI look-back period, 14 when omitted"))
                .signature(ticker_signature().param::<u32>("window")),
                |this: Arc<StockAnalyzer>, args: ToolArguments| async move {
                    let window = window(&args, Some(DEFAULT_RSI_WINDOW))?;
                    Ok(json!(this.rsi(args.get_str("ticker")?, window).await?))
                },
            )?
            .method(
                ToolSpec::new(
                    "calculate_MACD",
                    "Calculate the MACD line, signal line and histogram for a given stock ticker.",
                )
                .required(["ticker"])
                .doc(TICKER_DOC)
                .signature(ticker_signature()),
                |this: Arc<StockAnalyzer>, args: ToolArguments| async move {
                    Ok(json!(this.macd(args.get_str("ticker")?).await?))
                },
            )?
            .method(
                ToolSpec::new(
                    "get_financial_metrics",
                    "Fetch key financial ratios (forward P/E, price to book, debt to equity, profit margins) for a given stock ticker.",
                )
                .required(["ticker"])
                .doc(TICKER_DOC)
                .signature(ticker_signature()),
                |this: Arc<StockAnalyzer>, args: ToolArguments| async move {
                    Ok(json!(this.financial_metrics(args.get_str("ticker")?).await?))
                },
            )
    }
}

fn ticker_signature() -> Signature {
    Signature::method().param::<str>("ticker")
}

fn window_doc(window: &str) -> String {
    format!("{TICKER_DOC}\n:param window: {window}")
}

fn window(args: &ToolArguments, default: Option<usize>) -> Result<usize> {
    let raw = match (args.get_i64_opt("window"), default) {
        (Some(w), _) => w,
        (None, Some(d)) => return Ok(d),
        (None, None) => args.get_i64("window")?,
    };
    usize::try_from(raw)
        .ok()
        .filter(|w| *w > 0)
        .ok_or_else(|| StockbotError::InvalidArgument(format!("window must be positive, got {raw}")))
}

fn no_data(ticker: &str) -> StockbotError {
    StockbotError::InvalidArgument(format!("no price data for {ticker}"))
}

fn too_short(ticker: &str, window: usize, available: usize) -> StockbotError {
    StockbotError::InvalidArgument(format!(
        "window {window} needs more history than the {available} closes available for {ticker}"
    ))
}
