//! Stock-analysis tools for the stockbot assistant.
//!
//! Three modules make up the [`catalog`]:
//!
//! - `stock_analysis`: the `StockAnalyzer` class (price, SMA, EMA, RSI, MACD,
//!   financial ratios)
//! - `stock_plotter`: the `StockPlotter` class (one-year price chart artifact)
//! - `news_analyst`: the `get_news` function
//!
//! Price data comes from a [`PriceSource`](market::PriceSource) and ratios
//! from a [`FundamentalsSource`](fundamentals::FundamentalsSource); the
//! default for both is [`YahooFinance`](market::YahooFinance) at
//! `market_data_url`.

pub mod analysis;
pub mod fundamentals;
pub mod indicators;
pub mod market;
pub mod news;
pub mod plotter;

use std::sync::Arc;

use stockbot::config::StockbotConfig;
use stockbot::tools::{FnModule, ModuleExports, ModuleScanner, ToolModule, ToolRegistry};

use analysis::StockAnalyzer;
use market::YahooFinance;
use plotter::StockPlotter;

/// The static module table, in registration order.
pub fn catalog(config: &StockbotConfig) -> Vec<Box<dyn ToolModule>> {
    let analysis_config = config.clone();
    let plotter_config = config.clone();
    let news_config = config.clone();

    vec![
        Box::new(FnModule::new("stock_analysis", move || {
            let source = Arc::new(YahooFinance::from_config(&analysis_config)?);
            let analyzer = StockAnalyzer::new(source.clone(), source);
            Ok(ModuleExports::new().class(analyzer.into_tool_class()?))
        })),
        Box::new(FnModule::new("stock_plotter", move || {
            let source = Arc::new(YahooFinance::from_config(&plotter_config)?);
            let plotter = StockPlotter::new(source, plotter_config.plot_path.clone());
            Ok(ModuleExports::new().class(plotter.into_tool_class()?))
        })),
        Box::new(FnModule::new("news_analyst", move || {
            let source = Arc::new(YahooFinance::from_config(&news_config)?);
            Ok(ModuleExports::new().function(news::news_tool(source)?))
        })),
    ]
}

/// Scan the [`catalog`] into a registry.
pub fn default_registry(config: &StockbotConfig) -> ToolRegistry {
    ModuleScanner::new().scan(&catalog(config))
}
