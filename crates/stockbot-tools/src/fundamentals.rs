//! Valuation and balance-sheet ratios from the quote summary endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use stockbot::error::{Result, StockbotError};

use crate::market::{check_ticker, YahooFinance};

const SUMMARY_MODULES: &str = "financialData,defaultKeyStatistics";

/// Key ratios for one company. Any of them may be missing for a symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FinancialMetrics {
    /// Forward price/earnings.
    pub pe_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub profit_margins: Option<f64>,
}

/// Where the analyzer gets company fundamentals.
#[async_trait]
pub trait FundamentalsSource: Send + Sync {
    async fn financial_metrics(&self, ticker: &str) -> Result<FinancialMetrics>;
}

#[async_trait]
impl FundamentalsSource for YahooFinance {
    async fn financial_metrics(&self, ticker: &str) -> Result<FinancialMetrics> {
        let ticker = check_ticker(ticker)?;
        let summary: SummaryEnvelope = self
            .get_json(
                &["v10", "finance", "quoteSummary", ticker],
                &[("modules", SUMMARY_MODULES)],
            )
            .await?;
        summary.into_metrics(ticker)
    }
}

// Quote summary response types (internal)

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryEnvelope {
    quote_summary: QuoteSummary,
}

#[derive(Deserialize)]
struct QuoteSummary {
    result: Option<Vec<SummaryResult>>,
    error: Option<SummaryError>,
}

#[derive(Deserialize)]
struct SummaryError {
    description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResult {
    #[serde(default)]
    financial_data: FinancialData,
    #[serde(default)]
    default_key_statistics: KeyStatistics,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FinancialData {
    debt_to_equity: Option<RawValue>,
    profit_margins: Option<RawValue>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawValue>,
    price_to_book: Option<RawValue>,
}

/// `{"raw": 1.5, "fmt": "1.50"}`, or `{}` when the field is unavailable.
#[derive(Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

fn raw(value: Option<RawValue>) -> Option<f64> {
    value.and_then(|v| v.raw)
}

impl SummaryEnvelope {
    fn into_metrics(self, ticker: &str) -> Result<FinancialMetrics> {
        if let Some(err) = self.quote_summary.error {
            let reason = err.description.unwrap_or_else(|| "unknown error".into());
            return Err(StockbotError::InvalidArgument(format!(
                "no financial data for {ticker}: {reason}"
            )));
        }
        let result = self
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| {
                StockbotError::InvalidArgument(format!("no financial data for {ticker}"))
            })?;

        Ok(FinancialMetrics {
            pe_ratio: raw(result.default_key_statistics.forward_pe),
            price_to_book: raw(result.default_key_statistics.price_to_book),
            debt_to_equity: raw(result.financial_data.debt_to_equity),
            profit_margins: raw(result.financial_data.profit_margins),
        })
    }
}
