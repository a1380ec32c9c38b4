//! Ticker-indexed tables.
//!
//! A [`TickerFrame`] holds one row per unique ticker and an ordered list of
//! named columns of [`Value`]s. Scores, ranks, enrichment side-data and
//! risk metrics all travel through it.

use std::collections::{HashMap, HashSet};

use polars::prelude::{Column, DataFrame, NamedFrom, Series};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{CoreError, CoreResult};
use crate::finite::finite;

/// Name of the index column in exports.
pub const TICKER_COLUMN: &str = "ticker";

/// A single cell.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Null,
}

impl Value {
    /// Finite number, or `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(x) => finite(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Null or a non-finite number.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Number(x) => !x.is_finite(),
            Value::Text(_) => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Number(x) => match finite(*x) {
                Some(x) => serializer.serialize_f64(x),
                None => serializer.serialize_none(),
            },
            Value::Text(s) => serializer.serialize_str(s),
            Value::Null => serializer.serialize_none(),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(x)
    }
}

impl From<Option<f64>> for Value {
    fn from(x: Option<f64>) -> Self {
        x.map_or(Value::Null, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickerFrame {
    tickers: Vec<String>,
    columns: Vec<(String, Vec<Value>)>,
}

impl TickerFrame {
    /// Empty-column frame over `tickers`, which must be unique.
    pub fn new(tickers: Vec<String>) -> CoreResult<Self> {
        let mut seen = HashSet::with_capacity(tickers.len());
        for t in &tickers {
            if !seen.insert(t.as_str()) {
                return Err(CoreError::structural(format!("duplicate ticker {t}")));
            }
        }
        Ok(Self {
            tickers,
            columns: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        name == TICKER_COLUMN || self.columns.iter().any(|(n, _)| n == name)
    }

    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<Value>) -> CoreResult<()> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(CoreError::LengthMismatch {
                column: name,
                expected: self.len(),
                actual: values.len(),
            });
        }
        if self.has_column(&name) {
            return Err(CoreError::structural(format!("column {name} already exists")));
        }
        self.columns.push((name, values));
        Ok(())
    }

    pub fn add_numeric(&mut self, name: impl Into<String>, values: Vec<f64>) -> CoreResult<()> {
        self.add_column(name, values.into_iter().map(Value::Number).collect())
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// A column as numbers; nulls become NaN.
    pub fn numeric(&self, name: &str) -> CoreResult<Vec<f64>> {
        let column = self
            .column(name)
            .ok_or_else(|| CoreError::configuration(format!("column '{name}' not found")))?;
        column
            .iter()
            .map(|v| match v {
                Value::Number(x) => Ok(*x),
                Value::Null => Ok(f64::NAN),
                Value::Text(_) => Err(CoreError::structural(format!(
                    "column '{name}' is not numeric"
                ))),
            })
            .collect()
    }

    /// Cell at (row, column); `ticker` addresses the index.
    pub fn value(&self, row: usize, name: &str) -> Option<Value> {
        if name == TICKER_COLUMN {
            return self.tickers.get(row).map(|t| Value::Text(t.clone()));
        }
        self.column(name).and_then(|c| c.get(row)).cloned()
    }

    /// New frame with the given rows, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> TickerFrame {
        TickerFrame {
            tickers: rows.iter().map(|&i| self.tickers[i].clone()).collect(),
            columns: self
                .columns
                .iter()
                .map(|(n, v)| (n.clone(), rows.iter().map(|&i| v[i].clone()).collect()))
                .collect(),
        }
    }

    /// Keep only the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> CoreResult<TickerFrame> {
        let mut out = TickerFrame {
            tickers: self.tickers.clone(),
            columns: Vec::with_capacity(names.len()),
        };
        for name in names {
            if *name == TICKER_COLUMN {
                continue;
            }
            let column = self
                .column(name)
                .ok_or_else(|| CoreError::configuration(format!("column '{name}' not found")))?;
            out.columns.push((name.to_string(), column.to_vec()));
        }
        Ok(out)
    }

    /// Left join on ticker: every row of `self` is kept in order and gains the
    /// columns of `other`; tickers absent from `other` get nulls.
    pub fn left_join(&self, other: &TickerFrame) -> CoreResult<TickerFrame> {
        let index: HashMap<&str, usize> = other
            .tickers
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();
        let mut out = self.clone();
        for (name, values) in &other.columns {
            let joined = self
                .tickers
                .iter()
                .map(|t| {
                    index
                        .get(t.as_str())
                        .map_or(Value::Null, |&i| values[i].clone())
                })
                .collect();
            out.add_column(name.clone(), joined)?;
        }
        Ok(out)
    }

    /// Export to polars. Columns holding only numbers and nulls become
    /// nullable f64; anything with text becomes nullable strings.
    pub fn to_dataframe(&self) -> CoreResult<DataFrame> {
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(Column::Series(Series::new(
            TICKER_COLUMN.into(),
            self.tickers.clone(),
        ).into()));
        for (name, values) in &self.columns {
            let textual = values.iter().any(|v| matches!(v, Value::Text(_)));
            let series = if textual {
                let cells: Vec<Option<String>> = values
                    .iter()
                    .map(|v| match v {
                        Value::Text(s) => Some(s.clone()),
                        Value::Number(x) => finite(*x).map(|x| x.to_string()),
                        Value::Null => None,
                    })
                    .collect();
                Series::new(name.as_str().into(), cells)
            } else {
                let cells: Vec<Option<f64>> = values.iter().map(Value::as_f64).collect();
                Series::new(name.as_str().into(), cells)
            };
            columns.push(Column::Series(series.into()));
        }
        DataFrame::new(columns).map_err(|e| CoreError::Frame(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> TickerFrame {
        let mut f = TickerFrame::new(vec!["A".into(), "B".into(), "C".into()]).unwrap();
        f.add_numeric("FR", vec![-0.1, f64::NAN, 0.2]).unwrap();
        f
    }

    #[test]
    fn duplicate_tickers_rejected() {
        let err = TickerFrame::new(vec!["A".into(), "A".into()]).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn column_length_checked() {
        let mut f = frame();
        let err = f.add_numeric("x", vec![1.0]).unwrap_err();
        assert!(matches!(err, CoreError::LengthMismatch { expected: 3, actual: 1, .. }));
        assert!(f.add_numeric("FR", vec![0.0; 3]).is_err());
    }

    #[test]
    fn left_join_fills_missing_with_null() {
        let mut side = TickerFrame::new(vec!["C".into(), "A".into(), "Z".into()]).unwrap();
        side.add_column("sector", vec!["Energy".into(), "Banks".into(), "Other".into()])
            .unwrap();
        let joined = frame().left_join(&side).unwrap();
        assert_eq!(joined.tickers(), frame().tickers());
        assert_eq!(
            joined.column("sector").unwrap(),
            &[Value::from("Banks"), Value::Null, Value::from("Energy")]
        );
    }

    #[test]
    fn select_and_take_rows() {
        let f = frame();
        let picked = f.take_rows(&[2, 0]);
        assert_eq!(picked.tickers(), &["C".to_string(), "A".to_string()]);
        assert_eq!(picked.numeric("FR").unwrap(), vec![0.2, -0.1]);
        assert!(f.select(&["missing"]).unwrap_err().is_configuration());
        assert_eq!(f.select(&["ticker", "FR"]).unwrap().column_names(), vec!["FR"]);
    }

    #[test]
    fn value_serializes_non_finite_as_null() {
        let json = serde_json::to_string(&vec![
            Value::Number(1.0),
            Value::Number(f64::NAN),
            Value::Text("x".into()),
            Value::Null,
        ])
        .unwrap();
        assert_eq!(json, r#"[1.0,null,"x",null]"#);
        let back: Vec<Value> = serde_json::from_str(r#"[2.5,"y",null]"#).unwrap();
        assert_eq!(back, vec![Value::Number(2.5), Value::from("y"), Value::Null]);
    }

    #[test]
    fn exports_nullable_columns() {
        let df = frame().to_dataframe().unwrap();
        assert_eq!(df.shape(), (3, 2));
        assert_eq!(df.column("FR").unwrap().null_count(), 1);
    }
}
