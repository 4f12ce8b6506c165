//! Technical indicators over a series of closes (oldest first).
//!
//! All functions return `None` when the series is too short for the
//! requested window.

use serde::Serialize;

/// Default RSI look-back.
pub const DEFAULT_RSI_WINDOW: usize = 14;

const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;

/// Mean of the last `window` closes.
pub fn sma(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || window > closes.len() {
        return None;
    }
    let tail = &closes[closes.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// Exponentially weighted series with `alpha = 2 / (span + 1)`, seeded with
/// the first value.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    smooth(values, alpha)
}

/// Last value of [`ema_series`].
pub fn ema(closes: &[f64], span: usize) -> Option<f64> {
    if span == 0 {
        return None;
    }
    ema_series(closes, span).last().copied()
}

/// Relative strength index with Wilder smoothing (`alpha = 1 / window`).
pub fn rsi(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < 2 {
        return None;
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .map(|pair| {
            let delta = pair[1] - pair[0];
            (delta.max(0.0), (-delta).max(0.0))
        })
        .unzip();

    let alpha = 1.0 / window as f64;
    let avg_gain = *smooth(&gains, alpha).last()?;
    let avg_loss = *smooth(&losses, alpha).last()?;

    if avg_loss == 0.0 {
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Moving average convergence/divergence at the last close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD(12, 26) with a 9-period signal line.
pub fn macd(closes: &[f64]) -> Option<Macd> {
    if closes.is_empty() {
        return None;
    }
    let fast = ema_series(closes, MACD_FAST);
    let slow = ema_series(closes, MACD_SLOW);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema_series(&line, MACD_SIGNAL);

    let macd = *line.last()?;
    let signal = *signal.last()?;
    Some(Macd {
        macd,
        signal,
        histogram: macd - signal,
    })
}

fn smooth(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            Some(p) => alpha * v + (1.0 - alpha) * p,
            None => v,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}
