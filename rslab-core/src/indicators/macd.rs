//! MACD: difference of two EMAs, its EMA signal line and the histogram.
//!
//! - MACD_f_s          = ema(source, f) - ema(source, s)
//! - MACD_SIGNAL_g     = ema(MACD_f_s, g)
//! - MACD_HIST_f_s_g   = MACD_f_s - MACD_SIGNAL_g

use crate::domain::Field;
use crate::error::{CoreError, CoreResult};
use crate::indicators::{check_window, ema, Indicator};

#[derive(Debug, Clone)]
pub struct Macd {
    source: Field,
    fast: usize,
    slow: usize,
    signal: usize,
    name: String,
}

impl Macd {
    pub fn new(source: Field, fast: usize, slow: usize, signal: usize) -> CoreResult<Self> {
        check_window("MACD fast", fast)?;
        check_window("MACD slow", slow)?;
        check_window("MACD signal", signal)?;
        if fast >= slow {
            return Err(CoreError::configuration(format!(
                "MACD fast window {fast} must be shorter than slow window {slow}"
            )));
        }
        Ok(Self {
            source,
            fast,
            slow,
            signal,
            name: format!("macd_{fast}_{slow}_{signal}"),
        })
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    // EMA recurrences are defined from the first row.
    fn lookback(&self) -> usize {
        0
    }

    fn inputs(&self) -> Vec<Field> {
        vec![self.source]
    }

    fn outputs(&self) -> Vec<Field> {
        vec![
            Field::Macd {
                fast: self.fast,
                slow: self.slow,
            },
            Field::MacdSignal {
                signal: self.signal,
            },
            Field::MacdHist {
                fast: self.fast,
                slow: self.slow,
                signal: self.signal,
            },
        ]
    }

    fn compute(&self, inputs: &[&[f64]]) -> Vec<Vec<f64>> {
        let values = inputs[0];
        let fast = ema(values, self.fast);
        let slow = ema(values, self.slow);
        let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = ema(&line, self.signal);
        let hist = line.iter().zip(&signal).map(|(m, s)| m - s).collect();
        vec![line, signal, hist]
    }
}
