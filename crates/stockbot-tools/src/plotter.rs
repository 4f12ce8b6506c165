//! The `StockPlotter` tool class: a one-year price chart written as SVG.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use stockbot::error::Result;
use stockbot::tools::{Signature, ToolArguments, ToolClass, ToolSpec};

use crate::market::{PriceHistory, PriceSource};

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 500.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const Y_TICKS: usize = 6;
const X_TICKS: usize = 6;

/// Renders price charts to a fixed output path.
pub struct StockPlotter {
    source: Arc<dyn PriceSource>,
    output: PathBuf,
}

impl StockPlotter {
    pub fn new(source: Arc<dyn PriceSource>, output: impl Into<PathBuf>) -> Self {
        Self {
            source,
            output: output.into(),
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Fetch one year of closes for `ticker` and write the chart.
    pub async fn plot(&self, ticker: &str) -> Result<PathBuf> {
        let history = self.source.history(ticker).await?;
        let svg = render_chart(&history);

        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.output, svg).await?;
        debug!(ticker, path = %self.output.display(), points = history.len(), "wrote price chart");
        Ok(self.output.clone())
    }

    /// Expose the plotter as a tool class named `StockPlotter`.
    ///
    /// `plot_stock_price` is an artifact tool: its output is shown to the
    /// user, not fed back to the model.
    pub fn into_tool_class(self) -> Result<ToolClass> {
        ToolClass::new("StockPlotter", self).method(
            ToolSpec::new(
                "plot_stock_price",
                "Plot the stock price for the last year given the ticker symbol of a company.",
            )
            .required(["ticker"])
            .doc(":param ticker: The stock ticker symbol for a company (for example AAPL for Apple)")
            .artifact()
            .signature(Signature::method().param::<str>("ticker")),
            |this: Arc<StockPlotter>, args: ToolArguments| async move {
                let path = this.plot(args.get_str("ticker")?).await?;
                Ok(json!({ "path": path.display().to_string() }))
            },
        )
    }
}

/// Line chart of the closes with title, axis labels and grid.
pub fn render_chart(history: &PriceHistory) -> String {
    let bars = history.bars();
    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let (mut lo, mut hi) = bars.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| {
        (lo.min(b.close), hi.max(b.close))
    });
    if !lo.is_finite() {
        (lo, hi) = (0.0, 1.0);
    }
    if (hi - lo).abs() < f64::EPSILON {
        lo -= 1.0;
        hi += 1.0;
    }

    let last = bars.len().saturating_sub(1).max(1) as f64;
    let x_at = |i: usize| MARGIN_LEFT + plot_w * i as f64 / last;
    let y_at = |v: f64| MARGIN_TOP + plot_h * (hi - v) / (hi - lo);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="30" text-anchor="middle" font-size="18">{} Stock Price Over Last Year</text>"#,
        WIDTH / 2.0,
        escape(history.ticker())
    );

    let _ = writeln!(svg, r##"<g stroke="#d0d0d0" stroke-width="1">"##);
    for t in 0..Y_TICKS {
        let y = MARGIN_TOP + plot_h * t as f64 / (Y_TICKS - 1) as f64;
        let _ = writeln!(
            svg,
            r#"<line x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}"/>"#,
            MARGIN_LEFT + plot_w
        );
    }
    let x_ticks = tick_indices(bars.len());
    for &i in &x_ticks {
        let x = x_at(i);
        let _ = writeln!(
            svg,
            r#"<line x1="{x:.1}" y1="{MARGIN_TOP}" x2="{x:.1}" y2="{:.1}"/>"#,
            MARGIN_TOP + plot_h
        );
    }
    let _ = writeln!(svg, "</g>");

    let _ = writeln!(svg, r##"<g font-size="12" fill="#333">"##);
    for t in 0..Y_TICKS {
        let value = hi - (hi - lo) * t as f64 / (Y_TICKS - 1) as f64;
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{value:.2}</text>"#,
            MARGIN_LEFT - 8.0,
            y_at(value) + 4.0
        );
    }
    for &i in &x_ticks {
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            x_at(i),
            MARGIN_TOP + plot_h + 18.0,
            bars[i].date.format("%Y-%m-%d")
        );
    }
    let _ = writeln!(svg, "</g>");

    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="14">Date</text>"#,
        MARGIN_LEFT + plot_w / 2.0,
        HEIGHT - 15.0
    );
    let _ = writeln!(
        svg,
        r#"<text x="20" y="{0:.1}" text-anchor="middle" font-size="14" transform="rotate(-90 20 {0:.1})">Stock Price ($)</text>"#,
        MARGIN_TOP + plot_h / 2.0
    );

    let points: Vec<String> = bars
        .iter()
        .enumerate()
        .map(|(i, b)| format!("{:.1},{:.1}", x_at(i), y_at(b.close)))
        .collect();
    let _ = writeln!(
        svg,
        r##"<polyline fill="none" stroke="#1f77b4" stroke-width="1.5" points="{}"/>"##,
        points.join(" ")
    );
    let _ = writeln!(svg, "</svg>");
    svg
}

fn tick_indices(len: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    let steps = X_TICKS.min(len);
    let mut ticks: Vec<usize> = (0..steps)
        .map(|t| if steps == 1 { 0 } else { t * (len - 1) / (steps - 1) })
        .collect();
    ticks.dedup();
    ticks
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
