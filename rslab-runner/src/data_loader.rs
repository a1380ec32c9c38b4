//! Panel loading for the runner.
//!
//! Two sources feed a [`Panel`]:
//! - long-format CSV (`date,ticker,open,high,low,close,adj_close,volume`),
//!   one row per ticker per trading day, empty cells for missing values;
//! - synthetic random walks with trend regimes, seeded per ticker, for
//!   development and benches.
//!
//! CSV bars are restricted to the requested window and aligned onto the
//! union of dates; synthetic panels are generated directly on weekdays.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use rslab_core::data::align_bars;
use rslab_core::{CoreError, Field, Panel, PriceBar};

use crate::provider::PanelProvider;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("no price rows between {start} and {end}")]
    Empty { start: NaiveDate, end: NaiveDate },

    #[error("invalid window: start {start} is not before end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("panel error: {0}")]
    Panel(#[from] CoreError),
}

/// One CSV record.
#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    ticker: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    adj_close: Option<f64>,
    volume: Option<f64>,
}

impl CsvRow {
    fn into_bar(self) -> (String, PriceBar) {
        let nan = |v: Option<f64>| v.unwrap_or(f64::NAN);
        (
            self.ticker,
            PriceBar {
                date: self.date,
                open: nan(self.open),
                high: nan(self.high),
                low: nan(self.low),
                close: nan(self.close),
                adj_close: nan(self.adj_close),
                volume: nan(self.volume),
            },
        )
    }
}

/// Parse long-format CSV into bars grouped by ticker.
pub fn read_bars_csv<R: Read>(reader: R) -> Result<HashMap<String, Vec<PriceBar>>, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars: HashMap<String, Vec<PriceBar>> = HashMap::new();
    for record in csv_reader.deserialize::<CsvRow>() {
        let (ticker, bar) = record?.into_bar();
        bars.entry(ticker).or_default().push(bar);
    }
    Ok(bars)
}

/// Keep bars with `start <= date < end`, align them and build the panel.
pub fn panel_from_bars(
    bars: HashMap<String, Vec<PriceBar>>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Panel, LoadError> {
    if start >= end {
        return Err(LoadError::InvalidWindow { start, end });
    }
    let windowed: HashMap<String, Vec<PriceBar>> = bars
        .into_iter()
        .map(|(ticker, bars)| {
            let kept = bars
                .into_iter()
                .filter(|b| b.date >= start && b.date < end)
                .collect::<Vec<_>>();
            (ticker, kept)
        })
        .filter(|(_, bars)| !bars.is_empty())
        .collect();
    if windowed.is_empty() {
        return Err(LoadError::Empty { start, end });
    }

    let aligned = align_bars(windowed);
    for (ticker, rate) in aligned.void_rates() {
        if rate > 0.5 {
            warn!(%ticker, void_rate = rate, "ticker missing most of the window");
        }
    }
    let panel = aligned.into_panel()?;
    debug!(
        tickers = panel.tickers().len(),
        dates = panel.len(),
        %start,
        %end,
        "panel built"
    );
    Ok(panel)
}

/// Load a CSV file and build the panel for `[start, end)`.
pub fn load_panel_csv(
    path: impl AsRef<Path>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Panel, LoadError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    panel_from_bars(read_bars_csv(file)?, start, end)
}

/// Weekdays in `[start, end)`.
fn weekdays(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d < end)
        .filter(|d| d.weekday().number_from_monday() <= 5)
        .collect()
}

/// Open, high, low, close, adj close and volume columns for one ticker.
///
/// A log random walk from 100.0. Drift and volatility are drawn once per
/// ticker; the drift flips sign with probability 2% a day, so paths move
/// through up and down trends. The generator is seeded with the BLAKE3 hash
/// of the ticker.
fn synthetic_columns(ticker: &str, len: usize) -> Vec<(Field, Vec<f64>)> {
    let mut rng = StdRng::from_seed(*blake3::hash(ticker.as_bytes()).as_bytes());
    let mut drift: f64 = rng.gen_range(-0.001..0.001);
    let volatility: f64 = rng.gen_range(0.005..0.025);

    let mut open = Vec::with_capacity(len);
    let mut high = Vec::with_capacity(len);
    let mut low = Vec::with_capacity(len);
    let mut close = Vec::with_capacity(len);
    let mut volume = Vec::with_capacity(len);
    let mut price = 100.0_f64;
    for _ in 0..len {
        if rng.gen_bool(0.02) {
            drift = -drift;
        }
        let shock: f64 = rng.gen_range(-volatility..volatility);
        let next = price * (drift + shock).exp();
        let spread = volatility * rng.gen_range(0.0..0.5);
        open.push(price);
        high.push(price.max(next) * (1.0 + spread));
        low.push(price.min(next) * (1.0 - spread));
        close.push(next);
        volume.push(rng.gen_range(100_000.0..5_000_000.0_f64).round());
        price = next;
    }

    vec![
        (Field::Open, open),
        (Field::High, high),
        (Field::Low, low),
        (Field::Close, close.clone()),
        (Field::AdjClose, close),
        (Field::Volume, volume),
    ]
}

/// Synthetic panel for `tickers` over the weekdays of `[start, end)`.
///
/// The same ticker always gets the same path for the same window.
pub fn synthetic_panel(
    tickers: &[&str],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Panel, LoadError> {
    if start >= end {
        return Err(LoadError::InvalidWindow { start, end });
    }
    let dates = weekdays(start, end);
    if dates.is_empty() {
        return Err(LoadError::Empty { start, end });
    }
    let len = dates.len();
    let columns = tickers.iter().flat_map(|ticker| {
        synthetic_columns(ticker, len)
            .into_iter()
            .map(move |(field, values)| (field, ticker.to_string(), values))
    });
    let panel = Panel::from_columns(dates, columns)?;
    debug!(tickers = tickers.len(), dates = len, "synthetic panel built");
    Ok(panel)
}

/// Panels read from a long-format CSV file.
#[derive(Debug, Clone)]
pub struct CsvPanelProvider {
    path: PathBuf,
}

impl CsvPanelProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PanelProvider for CsvPanelProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn load(&self, start: NaiveDate, end: NaiveDate) -> Result<Panel, LoadError> {
        load_panel_csv(&self.path, start, end)
    }
}

/// Synthetic panels for a fixed ticker list.
#[derive(Debug, Clone)]
pub struct SyntheticPanelProvider {
    tickers: Vec<String>,
}

impl SyntheticPanelProvider {
    pub fn new(tickers: &[&str]) -> Self {
        Self {
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl PanelProvider for SyntheticPanelProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn load(&self, start: NaiveDate, end: NaiveDate) -> Result<Panel, LoadError> {
        warn!(tickers = self.tickers.len(), "generating synthetic price data");
        let tickers: Vec<&str> = self.tickers.iter().map(String::as_str).collect();
        synthetic_panel(&tickers, start, end)
    }
}
