//! Snapshot extraction and flattening.
//!
//! A [`Snapshot`] restricts a panel to one field at a list of resolved
//! trading dates (duplicates allowed). Flattening turns it into a
//! [`FlatScoreFrame`]: one row per ticker, prices ordered oldest to newest.

use chrono::NaiveDate;
use polars::prelude::{Column, DataFrame, DataType, NamedFrom, Series};
use serde::Serialize;
use tracing::debug;

use crate::domain::{Field, Panel};
use crate::error::{CoreError, CoreResult};
use crate::finite::{finite, serialize_f64_rows};
use crate::frame::{TickerFrame, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub field: Field,
    /// Row dates, in the order requested.
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    /// `values[row][ticker_index]`.
    #[serde(serialize_with = "serialize_f64_rows")]
    pub values: Vec<Vec<f64>>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.tickers.is_empty()
    }

    /// Export with a `date` column followed by one column per ticker.
    pub fn to_dataframe(&self) -> CoreResult<DataFrame> {
        let mut columns = Vec::with_capacity(self.tickers.len() + 1);
        columns.push(date_column(&self.dates)?);
        for (j, ticker) in self.tickers.iter().enumerate() {
            let cells: Vec<Option<f64>> = self.values.iter().map(|row| finite(row[j])).collect();
            columns.push(Column::Series(Series::new(ticker.as_str().into(), cells).into()));
        }
        DataFrame::new(columns).map_err(|e| CoreError::Frame(e.to_string()))
    }
}

/// Select `price_field` at each of `trading_dates`.
///
/// Every date must be present in the panel's index (resolve them first).
pub fn extract_price_snapshots(
    panel: &Panel,
    trading_dates: &[NaiveDate],
    price_field: Field,
) -> CoreResult<Snapshot> {
    let columns = panel.field_columns(price_field)?;
    let rows = trading_dates
        .iter()
        .map(|&date| {
            panel.row_index(date).ok_or_else(|| {
                CoreError::structural(format!("date {date} is not in the panel index"))
            })
        })
        .collect::<CoreResult<Vec<usize>>>()?;

    let values = rows
        .iter()
        .map(|&r| columns.iter().map(|(_, col)| col[r]).collect())
        .collect();
    Ok(Snapshot {
        field: price_field,
        dates: trading_dates.to_vec(),
        tickers: columns.iter().map(|(t, _)| t.to_string()).collect(),
        values,
    })
}

/// Ticker-indexed prices with ordinal columns `p0` (oldest) .. `pN` (newest).
#[derive(Debug, Clone, PartialEq)]
pub struct FlatScoreFrame {
    pub tickers: Vec<String>,
    /// Distinct snapshot dates, ascending; `dates[i]` backs column `p{i}`.
    pub dates: Vec<NaiveDate>,
    /// `prices[ticker_index][i]`.
    pub prices: Vec<Vec<f64>>,
}

impl FlatScoreFrame {
    /// Number of price columns.
    pub fn periods(&self) -> usize {
        self.dates.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        (0..self.periods()).map(|i| format!("p{i}")).collect()
    }

    /// Price columns as a ticker frame (`p0` .. `pN`).
    pub fn to_ticker_frame(&self) -> CoreResult<TickerFrame> {
        let mut frame = TickerFrame::new(self.tickers.clone())?;
        for (i, name) in self.column_names().into_iter().enumerate() {
            let column: Vec<Value> = self.prices.iter().map(|row| Value::Number(row[i])).collect();
            frame.add_column(name, column)?;
        }
        Ok(frame)
    }
}

/// Flatten a snapshot of `price_field` for scoring.
///
/// Duplicate dates collapse into one column; columns are sorted ascending.
/// Fails with a structural error on an empty snapshot, a field other than
/// `price_field`, or fewer than two distinct dates.
pub fn flatten_snapshot_for_scoring(
    snapshot: &Snapshot,
    price_field: Field,
) -> CoreResult<FlatScoreFrame> {
    if snapshot.is_empty() {
        return Err(CoreError::structural("snapshot is empty"));
    }
    if snapshot.field != price_field {
        return Err(CoreError::structural(format!(
            "snapshot holds field '{}', expected '{price_field}'",
            snapshot.field
        )));
    }
    if snapshot.values.len() != snapshot.dates.len() {
        return Err(CoreError::structural("snapshot rows do not match its dates"));
    }

    // Ascending distinct dates, each pointing at its first snapshot row.
    let mut order: Vec<(NaiveDate, usize)> = snapshot
        .dates
        .iter()
        .enumerate()
        .map(|(row, &date)| (date, row))
        .collect();
    order.sort();
    order.dedup_by_key(|(date, _)| *date);
    if order.len() < 2 {
        return Err(CoreError::structural(format!(
            "need at least two distinct snapshot dates, got {}",
            order.len()
        )));
    }

    let prices = (0..snapshot.tickers.len())
        .map(|j| order.iter().map(|&(_, row)| snapshot.values[row][j]).collect())
        .collect();
    debug!(
        tickers = snapshot.tickers.len(),
        periods = order.len(),
        "snapshot flattened"
    );
    Ok(FlatScoreFrame {
        tickers: snapshot.tickers.clone(),
        dates: order.into_iter().map(|(date, _)| date).collect(),
        prices,
    })
}

/// The panel row at `as_of` as a ticker frame: `price_field` under the column
/// `price`, then each of `fields` under its display name.
///
/// `as_of` must be a trading date of the panel; rows after it are never read.
/// With `fields` empty, every Stop-ATR field present in the panel is used.
pub fn extract_latest(
    panel: &Panel,
    as_of: NaiveDate,
    price_field: Field,
    fields: &[Field],
) -> CoreResult<TickerFrame> {
    let row = panel.row_index(as_of).ok_or_else(|| {
        CoreError::structural(format!("date {as_of} is not in the panel index"))
    })?;
    let prices = panel.field_columns(price_field)?;

    let extra: Vec<Field> = if fields.is_empty() {
        panel.fields().into_iter().filter(Field::is_stop_atr).collect()
    } else {
        fields.to_vec()
    };

    let tickers: Vec<String> = prices.iter().map(|(t, _)| t.to_string()).collect();
    let mut frame = TickerFrame::new(tickers)?;
    frame.add_numeric("price", prices.iter().map(|(_, col)| col[row]).collect())?;
    for field in extra {
        panel.require_field(field)?;
        let column = frame
            .tickers()
            .iter()
            .map(|t| panel.column(field, t).map_or(f64::NAN, |col| col[row]))
            .collect();
        frame.add_numeric(field.to_string(), column)?;
    }
    Ok(frame)
}

/// Date column in the polars `Date` type (days since the Unix epoch).
fn date_column(dates: &[NaiveDate]) -> CoreResult<Column> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| CoreError::Frame("invalid epoch".into()))?;
    let days: Vec<i32> = dates
        .iter()
        .map(|d| (*d - epoch).num_days() as i32)
        .collect();
    Column::new("date".into(), days)
        .cast(&DataType::Date)
        .map_err(|e| CoreError::Frame(format!("date cast: {e}")))
}
