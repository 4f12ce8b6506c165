//! The `get_news` tool: recent headlines for a ticker.

use std::sync::Arc;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;

use stockbot::error::Result;
use stockbot::tools::{FunctionTool, Signature, ToolArguments, ToolSpec};

use crate::market::YahooFinance;

const NEWS_COUNT: &str = "10";

/// One headline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsItem {
    pub title: String,
    /// Short abstract, when the service supplies one.
    pub summary: Option<String>,
    pub publisher: Option<String>,
    pub url: Option<String>,
    /// Publication date as `YYYY-MM-DD`.
    pub pubdate: Option<String>,
}

/// Stories mentioning `stock`, newest as the service orders them.
pub async fn fetch_news(source: &YahooFinance, stock: &str) -> Result<Vec<NewsItem>> {
    let found: SearchResponse = source
        .get_json(
            &["v1", "finance", "search"],
            &[("q", stock), ("newsCount", NEWS_COUNT), ("quotesCount", "0")],
        )
        .await?;

    Ok(stories(found))
}

fn stories(found: SearchResponse) -> Vec<NewsItem> {
    found
        .news
        .into_iter()
        .filter(|n| n.kind.as_deref().is_some_and(|k| k == "STORY"))
        .map(NewsItem::from)
        .collect()
}

/// `get_news(stock)` as a free-function tool.
pub fn news_tool(source: Arc<YahooFinance>) -> Result<FunctionTool> {
    FunctionTool::new(
        ToolSpec::new(
            "get_news",
            "Fetch relevant news articles (title, summary, publisher, URL and publication date) for a given stock ticker.",
        )
        .required(["stock"])
        .doc(":param stock: The stock ticker symbol")
        .signature(Signature::function().param::<str>("stock")),
        move |args: ToolArguments| {
            let source = Arc::clone(&source);
            async move { Ok(json!(fetch_news(&source, args.get_str("stock")?).await?)) }
        },
    )
}

// Search endpoint response types (internal)

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<SearchNews>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNews {
    title: String,
    summary: Option<String>,
    publisher: Option<String>,
    link: Option<String>,
    provider_publish_time: Option<i64>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl From<SearchNews> for NewsItem {
    fn from(n: SearchNews) -> Self {
        NewsItem {
            title: n.title,
            summary: n.summary,
            publisher: n.publisher,
            url: n.link,
            pubdate: n
                .provider_publish_time
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map(|dt| dt.format("%Y-%m-%d").to_string()),
        }
    }
}
