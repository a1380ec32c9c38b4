//! Panel-wide technical indicators.
//!
//! Every indicator implements [`Indicator`]: named input fields in, named
//! output fields out, computed per ticker over the full date index. Applying
//! an indicator never mutates or removes existing columns; it returns a new
//! [`Panel`] with the outputs appended.
//!
//! Undefined values (warmup rows, gaps in the input) are `f64::NAN`.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod sma;
pub mod stop_atr;

pub use atr::{true_range, wilder_smooth, Atr};
pub use bollinger::{rolling_std, Bollinger};
pub use ema::{ema, ewm};
pub use macd::Macd;
pub use sma::{rolling_mean, Sma};
pub use stop_atr::StopAtr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{Field, Panel};
use crate::error::{CoreError, CoreResult};

/// Trait for panel indicators.
///
/// `compute` sees one ticker at a time: `inputs[i]` is that ticker's column
/// for `self.inputs()[i]`, and the returned vectors line up with
/// `self.outputs()`. Each output must have the same length as the inputs.
///
/// # Look-ahead contamination guard
/// No output value at row t may depend on input rows after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Rows at the start of the index that are undefined by construction.
    fn lookback(&self) -> usize;

    fn inputs(&self) -> Vec<Field>;

    fn outputs(&self) -> Vec<Field>;

    fn compute(&self, inputs: &[&[f64]]) -> Vec<Vec<f64>>;
}

/// Apply one indicator to every ticker of `panel`.
///
/// Fails with `MissingField` if an input field is absent from the panel and
/// with `DuplicateColumn` if an output already exists. Tickers that lack one
/// of the inputs are skipped.
pub fn apply_indicator(panel: &Panel, indicator: &dyn Indicator) -> CoreResult<Panel> {
    let inputs = indicator.inputs();
    for field in &inputs {
        panel.require_field(*field)?;
    }
    let outputs = indicator.outputs();
    if panel.len() <= indicator.lookback() {
        warn!(
            indicator = indicator.name(),
            rows = panel.len(),
            lookback = indicator.lookback(),
            "history shorter than the indicator warmup; outputs are undefined"
        );
    }

    let mut additions = Vec::new();
    for ticker in panel.tickers() {
        let columns: Option<Vec<&[f64]>> =
            inputs.iter().map(|f| panel.column(*f, ticker)).collect();
        let Some(columns) = columns else {
            debug!(indicator = indicator.name(), ticker, "skipping ticker with missing input");
            continue;
        };
        let computed = indicator.compute(&columns);
        if computed.len() != outputs.len() {
            return Err(CoreError::structural(format!(
                "indicator {} produced {} series for {} outputs",
                indicator.name(),
                computed.len(),
                outputs.len()
            )));
        }
        for (field, values) in outputs.iter().zip(computed) {
            additions.push((*field, ticker.to_string(), values));
        }
    }
    debug!(
        indicator = indicator.name(),
        columns = additions.len(),
        "indicator applied"
    );
    panel.with_columns(additions)
}

/// Indicator parameters for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    /// Field the SMA, Bollinger and MACD indicators read.
    pub source: Field,
    pub sma_window: usize,
    pub bollinger_window: usize,
    pub bollinger_k: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_window: usize,
    pub atr_multiplier: f64,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            source: Field::AdjClose,
            sma_window: 20,
            bollinger_window: 20,
            bollinger_k: 2.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr_window: 14,
            atr_multiplier: 1.5,
        }
    }
}

/// Ordered battery of indicators applied as one additive transform.
pub struct IndicatorEngine {
    indicators: Vec<Box<dyn Indicator>>,
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self {
            indicators: Vec::new(),
        }
    }

    /// SMA, Bollinger, MACD, ATR and Stop-ATR in dependency order.
    pub fn from_params(params: &IndicatorParams) -> CoreResult<Self> {
        Ok(Self::new()
            .with(Sma::new(params.source, params.sma_window)?)
            .with(Bollinger::new(
                params.source,
                params.bollinger_window,
                params.bollinger_k,
            )?)
            .with(Macd::new(
                params.source,
                params.macd_fast,
                params.macd_slow,
                params.macd_signal,
            )?)
            .with(Atr::new(params.atr_window)?)
            .with(StopAtr::new(params.atr_window, params.atr_multiplier)?))
    }

    pub fn with(mut self, indicator: impl Indicator + 'static) -> Self {
        self.indicators.push(Box::new(indicator));
        self
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Every output field, in application order.
    pub fn outputs(&self) -> Vec<Field> {
        self.indicators.iter().flat_map(|i| i.outputs()).collect()
    }

    /// Apply each indicator in turn; later indicators may read earlier outputs.
    pub fn apply(&self, panel: &Panel) -> CoreResult<Panel> {
        let mut out = panel.clone();
        for indicator in &self.indicators {
            out = apply_indicator(&out, indicator.as_ref())?;
        }
        Ok(out)
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IndicatorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.indicators.iter().map(|i| i.name()))
            .finish()
    }
}

pub(crate) fn check_window(kind: &str, window: usize) -> CoreResult<()> {
    if window == 0 {
        return Err(CoreError::configuration(format!(
            "{kind} window must be >= 1"
        )));
    }
    Ok(())
}

pub(crate) fn check_multiplier(kind: &str, multiplier: f64) -> CoreResult<()> {
    if !(multiplier.is_finite() && multiplier > 0.0) {
        return Err(CoreError::configuration(format!(
            "{kind} multiplier must be positive, got {multiplier}"
        )));
    }
    Ok(())
}

/// Build a single-ticker panel from close prices for testing.
///
/// open = prev close (or close for the first row), high = max(open,close) + 1,
/// low = min(open,close) - 1, adj close = close, volume = 1000.
#[cfg(test)]
pub fn make_panel(ticker: &str, closes: &[f64]) -> Panel {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let dates = (0..closes.len())
        .map(|i| base_date + chrono::Duration::days(i as i64))
        .collect();
    let opens: Vec<f64> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| if i == 0 { c } else { closes[i - 1] })
        .collect();
    let highs: Vec<f64> = opens.iter().zip(closes).map(|(o, c)| o.max(*c) + 1.0).collect();
    let lows: Vec<f64> = opens.iter().zip(closes).map(|(o, c)| o.min(*c) - 1.0).collect();
    Panel::from_columns(
        dates,
        vec![
            (Field::Open, ticker.to_string(), opens),
            (Field::High, ticker.to_string(), highs),
            (Field::Low, ticker.to_string(), lows),
            (Field::Close, ticker.to_string(), closes.to_vec()),
            (Field::AdjClose, ticker.to_string(), closes.to_vec()),
            (Field::Volume, ticker.to_string(), vec![1000.0; closes.len()]),
        ],
    )
    .unwrap()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
