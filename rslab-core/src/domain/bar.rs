//! PriceBar: one ticker's OHLCV observation on one trading day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar as delivered by a market-data collaborator.
///
/// `adj_close` is the dividend/split adjusted close and the default scoring
/// field. Missing observations are represented by NaN, never by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// A bar with every value missing, used to pad a ticker onto a shared
    /// date index.
    pub fn void(date: NaiveDate) -> Self {
        Self {
            date,
            open: f64::NAN,
            high: f64::NAN,
            low: f64::NAN,
            close: f64::NAN,
            adj_close: f64::NAN,
            volume: f64::NAN,
        }
    }

    /// Returns true if any price is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.adj_close.is_nan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            adj_close: 102.5,
            volume: 50_000.0,
        }
    }

    #[test]
    fn void_bar_is_void() {
        let bar = PriceBar::void(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert!(bar.is_void());
    }

    #[test]
    fn missing_adj_close_makes_a_bar_void() {
        let mut bar = sample_bar();
        assert!(!bar.is_void());
        bar.adj_close = f64::NAN;
        assert!(bar.is_void());
    }
}
