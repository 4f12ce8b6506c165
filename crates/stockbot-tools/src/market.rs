//! Daily price history from the market data service.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use stockbot::config::StockbotConfig;
use stockbot::error::{Result, StockbotError};
use stockbot::provider::http::build_client;

const USER_AGENT: &str = concat!("stockbot/", env!("CARGO_PKG_VERSION"));

/// One daily close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily closes for one ticker, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    ticker: String,
    bars: Vec<PriceBar>,
}

impl PriceHistory {
    pub fn new(ticker: impl Into<String>, bars: Vec<PriceBar>) -> Self {
        Self {
            ticker: ticker.into(),
            bars,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Where the analytic tools get their prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// One year of daily closes for `ticker`.
    ///
    /// Fails with [`StockbotError::InvalidArgument`] when the service has no
    /// data for the symbol.
    async fn history(&self, ticker: &str) -> Result<PriceHistory>;
}

/// Reject symbols that could not be a ticker before they reach a URL path.
///
/// Accepts letters, digits and the `.`, `-`, `^`, `=` punctuation used by
/// share classes, indices and currency pairs (`BRK-B`, `^GSPC`, `EURUSD=X`).
pub fn check_ticker(ticker: &str) -> Result<&str> {
    let valid = ticker.chars().any(|c| c.is_ascii_alphanumeric())
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if valid {
        Ok(ticker)
    } else {
        Err(StockbotError::InvalidArgument(format!("invalid ticker symbol '{ticker}'")))
    }
}

/// Yahoo Finance chart, quote summary and search endpoints.
#[derive(Debug, Clone)]
pub struct YahooFinance {
    base_url: Url,
    client: reqwest::Client,
}

impl YahooFinance {
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref()).map_err(|e| {
            StockbotError::Configuration(format!("invalid market data URL '{}': {e}", base_url.as_ref()))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(StockbotError::Configuration(format!(
                "market data URL '{base_url}' cannot carry a path"
            )));
        }
        Ok(Self {
            base_url,
            client: build_client(timeout)?,
        })
    }

    pub fn from_config(config: &StockbotConfig) -> Result<Self> {
        Self::new(&config.market_data_url, config.request_timeout)
    }

    /// GET `segments` under the base URL. Each segment is percent-encoded.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                StockbotError::Configuration(format!(
                    "market data URL '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        debug!(url = %url, "market data request");

        let resp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StockbotError::api(status.as_u16(), body));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl PriceSource for YahooFinance {
    async fn history(&self, ticker: &str) -> Result<PriceHistory> {
        let ticker = check_ticker(ticker)?;
        let chart: ChartEnvelope = self
            .get_json(&["v8", "finance", "chart", ticker], &[("range", "1y"), ("interval", "1d")])
            .await?;
        chart.into_history(ticker)
    }
}

// Chart endpoint response types (internal)

#[derive(Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize)]
struct ChartError {
    description: Option<String>,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartEnvelope {
    fn into_history(self, ticker: &str) -> Result<PriceHistory> {
        if let Some(err) = self.chart.error {
            let reason = err.description.unwrap_or_else(|| "unknown error".into());
            return Err(StockbotError::InvalidArgument(format!(
                "no price data for {ticker}: {reason}"
            )));
        }

        let result = self
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| StockbotError::InvalidArgument(format!("no price data for {ticker}")))?;
        let closes = result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default();

        // Days without a close (halts, partial sessions) come back as null.
        let bars: Vec<PriceBar> = result
            .timestamp
            .iter()
            .zip(closes)
            .filter_map(|(&ts, close)| {
                let date = DateTime::from_timestamp(ts, 0)?.date_naive();
                Some(PriceBar { date, close: close? })
            })
            .collect();

        if bars.is_empty() {
            return Err(StockbotError::InvalidArgument(format!(
                "no price data for {ticker}"
            )));
        }
        Ok(PriceHistory::new(ticker, bars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn envelope(value: serde_json::Value) -> ChartEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn null_closes_are_dropped() {
        let chart = envelope(json!({
            "chart": {
                "result": [{
                    "timestamp": [1_704_205_800, 1_704_292_200, 1_704_378_600],
                    "indicators": {"quote": [{"close": [185.64, null, 181.91]}]}
                }],
                "error": null
            }
        }));

        let history = chart.into_history("AAPL").unwrap();
        assert_eq!(history.closes(), vec![185.64, 181.91]);
        assert_eq!(history.bars()[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(history.last_close(), Some(181.91));
    }

    #[test]
    fn service_error_names_the_ticker() {
        let chart = envelope(json!({
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        }));

        let err = chart.into_history("ZZZZ").unwrap_err();
        assert!(err.to_string().contains("ZZZZ"));
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn ticker_symbols_are_checked() {
        for ok in ["AAPL", "BRK-B", "^GSPC", "EURUSD=X", "7203.T"] {
            assert_eq!(check_ticker(ok).unwrap(), ok);
        }
        for bad in ["", "..", "BRK/B", "../../v1/finance/search", "AAPL?x=1", "A#B", "A B"] {
            assert!(matches!(check_ticker(bad), Err(StockbotError::InvalidArgument(_))), "{bad}");
        }
    }

    #[test]
    fn base_url_must_parse() {
        let timeout = Duration::from_secs(1);
        assert!(YahooFinance::new("https://query1.finance.yahoo.com/", timeout).is_ok());
        assert!(matches!(
            YahooFinance::new("not a url", timeout),
            Err(StockbotError::Configuration(_))
        ));
    }

    #[test]
    fn empty_result_is_an_error() {
        let chart = envelope(json!({
            "chart": {
                "result": [{"timestamp": [], "indicators": {"quote": [{"close": []}]}}],
                "error": null
            }
        }));
        assert!(matches!(
            chart.into_history("AAPL"),
            Err(StockbotError::InvalidArgument(_))
        ));
    }
}
