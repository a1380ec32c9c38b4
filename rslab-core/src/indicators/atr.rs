//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|), undefined
//! on the first row (no previous close).
//! ATR uses Wilder smoothing: the EWMA recurrence with alpha = 1/window,
//! seeded with the first defined true range.

use crate::domain::Field;
use crate::error::CoreResult;
use crate::indicators::{check_window, ewm, Indicator};

#[derive(Debug, Clone)]
pub struct Atr {
    window: usize,
    name: String,
}

impl Atr {
    pub fn new(window: usize) -> CoreResult<Self> {
        check_window("ATR", window)?;
        Ok(Self {
            window,
            name: format!("atr_{window}"),
        })
    }
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        1
    }

    fn inputs(&self) -> Vec<Field> {
        vec![Field::High, Field::Low, Field::Close]
    }

    fn outputs(&self) -> Vec<Field> {
        vec![Field::Atr {
            window: self.window,
        }]
    }

    fn compute(&self, inputs: &[&[f64]]) -> Vec<Vec<f64>> {
        let tr = true_range(inputs[0], inputs[1], inputs[2]);
        vec![wilder_smooth(&tr, self.window)]
    }
}

/// True Range series. Row 0 is NaN; any NaN operand makes its row NaN.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len().min(low.len()).min(close.len());
    let mut tr = vec![f64::NAN; n];
    for i in 1..n {
        let (h, l, pc) = (high[i], low[i], close[i - 1]);
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            continue;
        }
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

/// Wilder smoothing: EWMA with alpha = 1/window.
pub fn wilder_smooth(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return vec![f64::NAN; values.len()];
    }
    ewm(values, 1.0 / window as f64)
}
