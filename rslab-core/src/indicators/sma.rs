//! Simple Moving Average (SMA).
//!
//! Rolling mean of the source field over a window with `min_periods = window`:
//! the first `window - 1` rows are undefined, and any NaN inside a window makes
//! that row undefined.

use crate::domain::Field;
use crate::error::CoreResult;
use crate::indicators::{check_window, Indicator};

#[derive(Debug, Clone)]
pub struct Sma {
    source: Field,
    window: usize,
    name: String,
}

impl Sma {
    pub fn new(source: Field, window: usize) -> CoreResult<Self> {
        check_window("SMA", window)?;
        Ok(Self {
            source,
            window,
            name: format!("sma_{window}"),
        })
    }
}

impl Indicator for Sma {
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
        vec![Field::Sma {
            window: self.window,
        }]
    }

    fn compute(&self, inputs: &[&[f64]]) -> Vec<Vec<f64>> {
        vec![rolling_mean(inputs[0], self.window)]
    }
}

/// Rolling mean with `min_periods = window`.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || n < window {
        return result;
    }

    // Running sum over finite values plus a count of NaNs in the window.
    let mut sum = 0.0;
    let mut nan_count = 0usize;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            nan_count += 1;
        } else {
            sum += v;
        }
        if i >= window {
            let leaving = values[i - window];
            if leaving.is_nan() {
                nan_count -= 1;
            } else {
                sum -= leaving;
            }
        }
        if i + 1 >= window && nan_count == 0 {
            result[i] = sum / window as f64;
        }
    }
    result
}
