//! Bollinger Bands: rolling mean +/- k rolling standard deviations.
//!
//! - Mid:   SMA(source, window)
//! - Upper: mid + k * std(source, window)
//! - Lower: mid - k * std(source, window)
//!
//! Uses the sample standard deviation (divide by window - 1), so a window
//! of 1 leaves both bands undefined.

use crate::domain::Field;
use crate::error::CoreResult;
use crate::indicators::{check_multiplier, check_window, Indicator};

#[derive(Debug, Clone)]
pub struct Bollinger {
    source: Field,
    window: usize,
    k: f64,
    name: String,
}

impl Bollinger {
    pub fn new(source: Field, window: usize, k: f64) -> CoreResult<Self> {
        check_window("Bollinger", window)?;
        check_multiplier("Bollinger", k)?;
        Ok(Self {
            source,
            window,
            k,
            name: format!("bollinger_{window}_{k}"),
        })
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window.saturating_sub(1)
    }

    fn inputs(&self) -> Vec<Field> {
        vec![self.source]
    }

    fn outputs(&self) -> Vec<Field> {
        let window = self.window;
        vec![
            Field::BbMid { window },
            Field::BbUpper { window },
            Field::BbLower { window },
        ]
    }

    fn compute(&self, inputs: &[&[f64]]) -> Vec<Vec<f64>> {
        let values = inputs[0];
        let n = values.len();
        let mut mid = vec![f64::NAN; n];
        let mut upper = vec![f64::NAN; n];
        let mut lower = vec![f64::NAN; n];

        for i in (self.window.saturating_sub(1))..n {
            let Some((mean, std)) = window_stats(&values[i + 1 - self.window..=i]) else {
                continue;
            };
            mid[i] = mean;
            upper[i] = mean + self.k * std;
            lower[i] = mean - self.k * std;
        }
        vec![mid, upper, lower]
    }
}

/// Mean and sample standard deviation of a window, or `None` if it holds a NaN.
/// The deviation is NaN for a single-element window.
fn window_stats(window: &[f64]) -> Option<(f64, f64)> {
    if window.iter().any(|v| v.is_nan()) {
        return None;
    }
    let len = window.len() as f64;
    let mean = window.iter().sum::<f64>() / len;
    let ss: f64 = window.iter().map(|v| (v - mean) * (v - mean)).sum();
    let std = if window.len() > 1 {
        (ss / (len - 1.0)).sqrt()
    } else {
        f64::NAN
    };
    Some((mean, std))
}

/// Rolling sample standard deviation with `min_periods = window`.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 {
        return result;
    }
    for i in (window - 1)..n {
        if let Some((_, std)) = window_stats(&values[i + 1 - window..=i]) {
            result[i] = std;
        }
    }
    result
}
