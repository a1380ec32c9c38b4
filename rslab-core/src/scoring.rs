//! Relative-strength scoring.
//!
//! The weighted score (FR) compares every historical snapshot price with the
//! latest one:
//!
//! ```text
//! variation_i = p_i / p_last - 1            for i in 0..N-1
//! weight_i    = sqrt(N - 1 - i) / sum_j sqrt(N - 1 - j)
//! FR          = round(sum_i variation_i * weight_i, 6)
//! ```
//!
//! Older periods weigh more. FR depends on price ratios only, so it is
//! unchanged when a whole history is scaled by a positive constant.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::finite::round_to;
use crate::frame::TickerFrame;
use crate::snapshot::FlatScoreFrame;

/// Default score column name.
pub const SCORE_COLUMN: &str = "FR";

/// How a flattened snapshot is turned into a score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ScoreMethod {
    /// Weighted relative strength over every snapshot period.
    #[default]
    WeightedRelativeStrength,
    /// `p_last / p_first - 1`. With `scale = Some((lo, hi))` the raw returns
    /// are min-max scaled into `[lo, hi]` and rounded to 2 decimals;
    /// otherwise the raw return is rounded to 4 decimals.
    TotalReturn { scale: Option<(f64, f64)> },
}

/// Normalized weights for `periods` snapshot prices; `periods - 1` entries,
/// oldest first. Empty when `periods < 2`.
pub fn relative_strength_weights(periods: usize) -> Vec<f64> {
    if periods < 2 {
        return Vec::new();
    }
    let raw: Vec<f64> = (0..periods - 1)
        .map(|i| ((periods - 1 - i) as f64).sqrt())
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

/// Unrounded weighted relative strength of one price history (oldest first).
/// NaN when any price is undefined or the latest price is zero.
pub fn weighted_relative_strength(prices: &[f64]) -> f64 {
    let Some(&last) = prices.last() else {
        return f64::NAN;
    };
    let weights = relative_strength_weights(prices.len());
    if weights.is_empty() {
        return f64::NAN;
    }
    let score: f64 = prices
        .iter()
        .zip(&weights)
        .map(|(p, w)| (p / last - 1.0) * w)
        .sum();
    if score.is_finite() {
        score
    } else {
        f64::NAN
    }
}

/// Score every ticker of `flat` with the weighted method.
///
/// Returns the price columns `p0..pN` plus `FR`. Undefined scores stay in the
/// frame as NaN; ranking drops them.
pub fn calculate_relative_strength(flat: &FlatScoreFrame) -> CoreResult<TickerFrame> {
    score_frame(flat, ScoreMethod::WeightedRelativeStrength)
}

/// Score every ticker of `flat` with `method`.
pub fn score_frame(flat: &FlatScoreFrame, method: ScoreMethod) -> CoreResult<TickerFrame> {
    let periods = flat.periods();
    if periods < 2 {
        return Err(CoreError::structural(format!(
            "scoring needs at least two price columns, got {periods}"
        )));
    }
    if flat.prices.len() != flat.tickers.len()
        || flat.prices.iter().any(|row| row.len() != periods)
    {
        return Err(CoreError::structural("price rows do not match the frame shape"));
    }
    let mut frame = flat.to_ticker_frame()?;

    match method {
        ScoreMethod::WeightedRelativeStrength => {
            let scores = flat
                .prices
                .iter()
                .map(|row| round_to(weighted_relative_strength(row), 6))
                .collect();
            frame.add_numeric(SCORE_COLUMN, scores)?;
        }
        ScoreMethod::TotalReturn { scale } => {
            // Rows without a first or last price are dropped.
            let keep: Vec<usize> = flat
                .prices
                .iter()
                .enumerate()
                .filter(|(_, row)| row[0].is_finite() && row[periods - 1].is_finite())
                .map(|(i, _)| i)
                .collect();
            frame = frame.take_rows(&keep);
            let raw: Vec<f64> = keep
                .iter()
                .map(|&i| flat.prices[i][periods - 1] / flat.prices[i][0] - 1.0)
                .collect();
            let scores = match scale {
                Some((lo, hi)) => min_max_scale(&raw, lo, hi)
                    .into_iter()
                    .map(|v| round_to(v, 2))
                    .collect(),
                None => raw.into_iter().map(|v| round_to(v, 4)).collect(),
            };
            frame.add_numeric(SCORE_COLUMN, scores)?;
        }
    }
    debug!(tickers = frame.len(), periods, ?method, "scores computed");
    Ok(frame)
}

/// Min-max scale finite values into `[lo, hi]`; a degenerate range maps every
/// value to the midpoint. Non-finite values stay NaN.
fn min_max_scale(values: &[f64], lo: f64, hi: f64) -> Vec<f64> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let min = finite.clone().fold(f64::INFINITY, f64::min);
    let max = finite.fold(f64::NEG_INFINITY, f64::max);
    // Absolute tolerance 1e-8 plus relative tolerance 1e-5.
    let degenerate = !(max - min).is_finite() || (max - min).abs() <= 1e-8 + 1e-5 * max.abs();
    values
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                f64::NAN
            } else if degenerate {
                (lo + hi) / 2.0
            } else {
                (v - min) / (max - min) * (hi - lo) + lo
            }
        })
        .collect()
}
