//! Risk/return augmentation of the ranked, enriched frame.
//!
//! - `distance`         = (high52w - price) / high52w * 100, when high52w > 0
//! - `risk_pct`         = (price - stop) / stop * 100, when stop > 0
//! - `return_over_risk` = distance / risk_pct, when risk_pct != 0
//!
//! Anything else is null. The ratio uses the unrounded metrics; all three
//! are rounded at the end.

use serde::{Deserialize, Serialize};

use crate::domain::Field;
use crate::error::CoreResult;
use crate::finite::round_to;
use crate::frame::{TickerFrame, Value};

pub const DISTANCE_COLUMN: &str = "distance";
pub const RISK_COLUMN: &str = "risk_pct";
pub const RETURN_OVER_RISK_COLUMN: &str = "return_over_risk";

/// Input column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskColumns {
    pub price: String,
    pub stop: String,
    pub high_52w: String,
}

impl RiskColumns {
    /// Columns as produced by `extract_latest` plus the enrichment `high_52w`.
    pub fn for_stop(stop: Field) -> Self {
        Self {
            price: "price".to_string(),
            stop: stop.to_string(),
            high_52w: "high_52w".to_string(),
        }
    }
}

impl Default for RiskColumns {
    fn default() -> Self {
        Self::for_stop(Field::stop_atr(14, 1.5))
    }
}

/// Per-row metrics, unrounded; `None` where undefined.
pub fn risk_metrics(
    price: f64,
    stop: f64,
    high_52w: f64,
) -> (Option<f64>, Option<f64>, Option<f64>) {
    let distance = (high_52w > 0.0)
        .then(|| (high_52w - price) / high_52w * 100.0)
        .filter(|v| v.is_finite());
    let risk = (stop > 0.0)
        .then(|| (price - stop) / stop * 100.0)
        .filter(|v| v.is_finite());
    let ratio = match (distance, risk) {
        (Some(d), Some(r)) if r != 0.0 => Some(d / r).filter(|v| v.is_finite()),
        _ => None,
    };
    (distance, risk, ratio)
}

/// Append `distance`, `risk_pct` and `return_over_risk` to `frame`.
///
/// Missing input columns are a configuration error.
pub fn calculate_risk_return(
    frame: &TickerFrame,
    columns: &RiskColumns,
    decimals: u32,
) -> CoreResult<TickerFrame> {
    let price = frame.numeric(&columns.price)?;
    let stop = frame.numeric(&columns.stop)?;
    let high = frame.numeric(&columns.high_52w)?;

    let mut distance: Vec<Value> = Vec::with_capacity(frame.len());
    let mut risk: Vec<Value> = Vec::with_capacity(frame.len());
    let mut ratio: Vec<Value> = Vec::with_capacity(frame.len());
    for i in 0..frame.len() {
        let (d, r, q) = risk_metrics(price[i], stop[i], high[i]);
        distance.push(d.map(|v| round_to(v, decimals)).into());
        risk.push(r.map(|v| round_to(v, decimals)).into());
        ratio.push(q.map(|v| round_to(v, decimals)).into());
    }

    let mut out = frame.clone();
    out.add_column(DISTANCE_COLUMN, distance)?;
    out.add_column(RISK_COLUMN, risk)?;
    out.add_column(RETURN_OVER_RISK_COLUMN, ratio)?;
    Ok(out)
}
