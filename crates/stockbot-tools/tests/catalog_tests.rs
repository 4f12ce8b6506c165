//! The tool catalog end to end against a mock market data service.

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stockbot::config::StockbotConfig;
use stockbot::error::StockbotError;
use stockbot_tools::default_registry;

fn chart(closes: &[f64]) -> serde_json::Value {
    let timestamps: Vec<i64> = (0..closes.len() as i64)
        .map(|i| 1_704_205_800 + i * 86_400)
        .collect();
    json!({
        "chart": {
            "result": [{
                "meta": {"symbol": "AAPL", "currency": "USD"},
                "timestamp": timestamps,
                "indicators": {"quote": [{"close": closes}]}
            }],
            "error": null
        }
    })
}

async fn market(closes: &[f64]) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/AAPL"))
        .and(query_param("range", "1y"))
        .and(query_param("interval", "1d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chart(closes)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/ZZZZ"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        })))
        .mount(&server)
        .await;
    server
}

fn config(server: &MockServer, plot_path: &std::path::Path) -> StockbotConfig {
    let mut config = StockbotConfig::new();
    config.market_data_url = server.uri();
    config.plot_path = plot_path.to_path_buf();
    config
}

#[tokio::test]
async fn catalog_registers_every_tool_without_credentials() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let registry = default_registry(&config(&server, &dir.path().join("stock.svg")));

    assert_eq!(
        registry.list_names(),
        vec![
            "StockAnalyzer.get_stock_price",
            "StockAnalyzer.calculate_SMA",
            "StockAnalyzer.calculate_EMA",
            "StockAnalyzer.calculate_RSI",
            "StockAnalyzer.calculate_MACD",
            "StockAnalyzer.get_financial_metrics",
            "StockPlotter.plot_stock_price",
            "get_news",
        ]
    );
    assert!(registry.is_artifact("StockPlotter.plot_stock_price"));
    assert!(!registry.is_artifact("get_news"));
}

#[tokio::test]
async fn analyzer_reads_closes_from_the_chart_endpoint() {
    let server = market(&[185.5, 186.0, 187.0, 189.5]).await;
    let dir = tempfile::tempdir().unwrap();
    let registry = default_registry(&config(&server, &dir.path().join("stock.svg")));

    let price = registry
        .invoke("StockAnalyzer.get_stock_price", &json!({"ticker": "AAPL"}))
        .await
        .unwrap();
    assert_eq!(price, json!("189.5"));

    let sma = registry
        .invoke(
            "StockAnalyzer.calculate_SMA",
            &json!({"ticker": "AAPL", "window": 2}),
        )
        .await
        .unwrap();
    assert_eq!(sma, json!(188.25));
}

#[tokio::test]
async fn unknown_symbol_is_an_invocation_error() {
    let server = market(&[1.0]).await;
    let dir = tempfile::tempdir().unwrap();
    let registry = default_registry(&config(&server, &dir.path().join("stock.svg")));

    let err = registry
        .invoke("StockAnalyzer.get_stock_price", &json!({"ticker": "ZZZZ"}))
        .await
        .unwrap_err();
    assert!(matches!(err, StockbotError::Invocation { .. }));
}

#[tokio::test]
async fn plotter_writes_svg_to_configured_path() {
    let server = market(&[185.5, 186.0, 187.0, 189.5]).await;
    let dir = tempfile::tempdir().unwrap();
    let plot = dir.path().join("assets").join("stock.svg");
    let registry = default_registry(&config(&server, &plot));

    let result = registry
        .invoke("StockPlotter.plot_stock_price", &json!({"ticker": "AAPL"}))
        .await
        .unwrap();

    assert_eq!(result, json!({"path": plot.display().to_string()}));
    let svg = std::fs::read_to_string(&plot).unwrap();
    assert!(svg.contains("AAPL Stock Price Over Last Year"));
}

#[tokio::test]
async fn news_keeps_stories_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/finance/search"))
        .and(query_param("q", "TSLA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quotes": [],
            "news": [
                {
                    "title": "Tesla deliveries beat estimates",
                    "publisher": "Reuters",
                    "link": "https://example.test/tsla",
                    "providerPublishTime": 1_718_000_000,
                    "type": "STORY"
                },
                {
                    "title": "Tesla earnings call replay",
                    "publisher": "Yahoo",
                    "link": "https://example.test/video",
                    "providerPublishTime": 1_718_000_100,
                    "type": "VIDEO"
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let registry = default_registry(&config(&server, &dir.path().join("stock.svg")));

    let news = registry
        .invoke("get_news", &json!({"stock": "TSLA"}))
        .await
        .unwrap();

    assert_eq!(
        news,
        json!([{
            "title": "Tesla deliveries beat estimates",
            "summary": null,
            "publisher": "Reuters",
            "url": "https://example.test/tsla",
            "pubdate": "2024-06-10"
        }])
    );
}

#[tokio::test]
async fn ticker_cannot_escape_the_chart_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"news": []})))
        .expect(0)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let registry = default_registry(&config(&server, &dir.path().join("stock.svg")));

    for ticker in ["../../v1/finance/search", "BRK/B", "AAPL?range=max"] {
        let err = registry
            .invoke("StockAnalyzer.get_stock_price", &json!({"ticker": ticker}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid ticker symbol"), "{ticker}: {err}");
    }
}

#[tokio::test]
async fn financial_metrics_come_from_the_quote_summary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/BRK-B"))
        .and(query_param("modules", "financialData,defaultKeyStatistics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quoteSummary": {
                "result": [{
                    "financialData": {
                        "debtToEquity": {"raw": 21.5, "fmt": "21.50%"},
                        "profitMargins": {"raw": 0.1853, "fmt": "18.53%"}
                    },
                    "defaultKeyStatistics": {
                        "forwardPE": {"raw": 22.1, "fmt": "22.10"},
                        "priceToBook": {"raw": 1.6, "fmt": "1.60"}
                    }
                }],
                "error": null
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let registry = default_registry(&config(&server, &dir.path().join("stock.svg")));

    let metrics = registry
        .invoke("StockAnalyzer.get_financial_metrics", &json!({"ticker": "BRK-B"}))
        .await
        .unwrap();

    assert_eq!(
        metrics,
        json!({
            "pe_ratio": 22.1,
            "price_to_book": 1.6,
            "debt_to_equity": 21.5,
            "profit_margins": 0.1853,
        })
    );
}
