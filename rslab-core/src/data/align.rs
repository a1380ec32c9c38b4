//! Multi-ticker time alignment.
//!
//! Given bars for several tickers, align them to the union of their dates.
//! Missing bars become void (NaN) bars; prices are never forward-filled.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

use crate::domain::{Field, Panel, PriceBar};
use crate::error::CoreResult;

/// Bars for several tickers on a common timeline.
#[derive(Debug)]
pub struct AlignedBars {
    /// The common date axis (sorted ascending).
    pub dates: Vec<NaiveDate>,
    /// Bars per ticker, each with the same length as `dates`.
    pub bars: HashMap<String, Vec<PriceBar>>,
    /// Tickers included, sorted.
    pub tickers: Vec<String>,
}

impl AlignedBars {
    /// Share of void bars per ticker.
    pub fn void_rates(&self) -> HashMap<String, f64> {
        self.bars
            .iter()
            .map(|(ticker, bars)| {
                let voids = bars.iter().filter(|b| b.is_void()).count();
                let rate = if bars.is_empty() {
                    0.0
                } else {
                    voids as f64 / bars.len() as f64
                };
                (ticker.clone(), rate)
            })
            .collect()
    }

    /// Convert into a Panel with the six raw price fields per ticker.
    pub fn into_panel(self) -> CoreResult<Panel> {
        let mut panel = Panel::new(self.dates)?;
        for ticker in &self.tickers {
            let bars = match self.bars.get(ticker) {
                Some(bars) => bars,
                None => continue,
            };
            let pick = |f: fn(&PriceBar) -> f64| bars.iter().map(f).collect::<Vec<f64>>();
            panel.insert(Field::Open, ticker.as_str(), pick(|b| b.open))?;
            panel.insert(Field::High, ticker.as_str(), pick(|b| b.high))?;
            panel.insert(Field::Low, ticker.as_str(), pick(|b| b.low))?;
            panel.insert(Field::Close, ticker.as_str(), pick(|b| b.close))?;
            panel.insert(Field::AdjClose, ticker.as_str(), pick(|b| b.adj_close))?;
            panel.insert(Field::Volume, ticker.as_str(), pick(|b| b.volume))?;
        }
        Ok(panel)
    }
}

/// Align several tickers to a common timeline.
///
/// For each date in the union of all tickers' dates, each ticker either has
/// a real bar or gets a void bar. A ticker that reports the same date twice
/// keeps the last bar.
pub fn align_bars(ticker_bars: HashMap<String, Vec<PriceBar>>) -> AlignedBars {
    let dates: Vec<NaiveDate> = ticker_bars
        .values()
        .flat_map(|bars| bars.iter().map(|b| b.date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut tickers: Vec<String> = ticker_bars.keys().cloned().collect();
    tickers.sort();

    let mut aligned: HashMap<String, Vec<PriceBar>> = HashMap::new();
    for (ticker, bars) in &ticker_bars {
        let by_date: HashMap<NaiveDate, &PriceBar> = bars.iter().map(|b| (b.date, b)).collect();
        let series = dates
            .iter()
            .map(|date| {
                by_date
                    .get(date)
                    .map(|b| (*b).clone())
                    .unwrap_or_else(|| PriceBar::void(*date))
            })
            .collect();
        aligned.insert(ticker.clone(), series);
    }

    AlignedBars {
        dates,
        bars: aligned,
        tickers,
    }
}
