//! ATR stop level: close - multiplier * ATR.
//!
//! Reads the ATR column, so it must run after [`Atr`](super::Atr) with the
//! same window. The output field embeds both window and multiplier.

use crate::domain::Field;
use crate::error::CoreResult;
use crate::indicators::{check_multiplier, check_window, Indicator};

#[derive(Debug, Clone)]
pub struct StopAtr {
    window: usize,
    multiplier: f64,
    name: String,
}

impl StopAtr {
    pub fn new(window: usize, multiplier: f64) -> CoreResult<Self> {
        check_window("Stop-ATR", window)?;
        check_multiplier("Stop-ATR", multiplier)?;
        Ok(Self {
            window,
            multiplier,
            name: format!("stop_atr_{window}_{multiplier}"),
        })
    }

    pub fn field(&self) -> Field {
        Field::stop_atr(self.window, self.multiplier)
    }
}

impl Indicator for StopAtr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        1
    }

    fn inputs(&self) -> Vec<Field> {
        vec![Field::Close, Field::Atr { window: self.window }]
    }

    fn outputs(&self) -> Vec<Field> {
        vec![self.field()]
    }

    fn compute(&self, inputs: &[&[f64]]) -> Vec<Vec<f64>> {
        let (close, atr) = (inputs[0], inputs[1]);
        vec![close
            .iter()
            .zip(atr)
            .map(|(c, a)| c - self.multiplier * a)
            .collect()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::indicators::{apply_indicator, assert_approx, make_panel, Atr, DEFAULT_EPSILON};

    #[test]
    fn stop_is_close_minus_multiple_of_atr() {
        let close = [10.0, 11.0, 12.0];
        let atr = [f64::NAN, 2.0, 4.0];
        let out = StopAtr::new(14, 1.5).unwrap().compute(&[&close[..], &atr[..]]);
        assert!(out[0][0].is_nan());
        assert_approx(out[0][1], 8.0, DEFAULT_EPSILON);
        assert_approx(out[0][2], 6.0, DEFAULT_EPSILON);
    }

    #[test]
    fn requires_atr_column() {
        let panel = make_panel("BBAS3", &[1.0, 2.0, 3.0]);
        let stop = StopAtr::new(3, 2.0).unwrap();
        let err = apply_indicator(&panel, &stop).unwrap_err();
        assert_eq!(err, CoreError::MissingField { field: Field::Atr { window: 3 } });

        let with_atr = apply_indicator(&panel, &Atr::new(3).unwrap()).unwrap();
        let out = apply_indicator(&with_atr, &stop).unwrap();
        assert_eq!(out.fields().last(), Some(&Field::stop_atr(3, 2.0)));
        assert_eq!(stop.field().to_string(), "STOP_ATR_3_2");
    }
}
