//! Panel: a (Field, Ticker)-keyed table over one shared, ordered date index.
//!
//! Every column has exactly one value per date; construction rejects
//! mismatched lengths, unsorted or duplicate dates and duplicate keys.
//! Undefined values are NaN. Columns are only ever added: indicator
//! transforms clone the panel and append, they never rewrite an existing
//! column.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use super::Field;
use crate::error::{CoreError, CoreResult};

/// Second-level column key: which field for which ticker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnKey {
    pub field: Field,
    pub ticker: String,
}

impl ColumnKey {
    pub fn new(field: Field, ticker: impl Into<String>) -> Self {
        Self {
            field,
            ticker: ticker.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<ColumnKey, Vec<f64>>,
}

impl Panel {
    /// Create an empty panel over `dates`, which must be strictly ascending.
    pub fn new(dates: Vec<NaiveDate>) -> CoreResult<Self> {
        if let Some(pair) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(CoreError::structural(format!(
                "date index must be strictly ascending (found {} then {})",
                pair[0], pair[1]
            )));
        }
        Ok(Self {
            dates,
            columns: BTreeMap::new(),
        })
    }

    /// Build a panel from a date index and a list of columns in one step.
    pub fn from_columns<I>(dates: Vec<NaiveDate>, columns: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (Field, String, Vec<f64>)>,
    {
        let mut panel = Self::new(dates)?;
        for (field, ticker, values) in columns {
            panel.insert(field, ticker, values)?;
        }
        Ok(panel)
    }

    /// Insert a new column. Fails on a length mismatch or an existing key.
    pub fn insert(
        &mut self,
        field: Field,
        ticker: impl Into<String>,
        values: Vec<f64>,
    ) -> CoreResult<()> {
        let key = ColumnKey::new(field, ticker);
        if values.len() != self.dates.len() {
            return Err(CoreError::LengthMismatch {
                column: format!("{}/{}", key.field, key.ticker),
                expected: self.dates.len(),
                actual: values.len(),
            });
        }
        if self.columns.contains_key(&key) {
            return Err(CoreError::DuplicateColumn {
                field: key.field,
                ticker: key.ticker,
            });
        }
        self.columns.insert(key, values);
        Ok(())
    }

    /// Return a new panel with `additions` appended. `self` is untouched.
    pub fn with_columns<I>(&self, additions: I) -> CoreResult<Panel>
    where
        I: IntoIterator<Item = (Field, String, Vec<f64>)>,
    {
        let mut out = self.clone();
        for (field, ticker, values) in additions {
            out.insert(field, ticker, values)?;
        }
        Ok(out)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of rows (trading dates).
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Distinct tickers across all fields, sorted.
    pub fn tickers(&self) -> Vec<&str> {
        self.columns
            .keys()
            .map(|k| k.ticker.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct fields, in key order.
    pub fn fields(&self) -> Vec<Field> {
        self.columns
            .keys()
            .map(|k| k.field)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.columns.keys().any(|k| k.field == field)
    }

    /// Fail with `MissingField` unless at least one ticker carries `field`.
    pub fn require_field(&self, field: Field) -> CoreResult<()> {
        if self.has_field(field) {
            Ok(())
        } else {
            Err(CoreError::MissingField { field })
        }
    }

    pub fn column(&self, field: Field, ticker: &str) -> Option<&[f64]> {
        self.columns
            .get(&ColumnKey::new(field, ticker))
            .map(|v| v.as_slice())
    }

    /// Every ticker's column for one field, ordered by ticker.
    pub fn field_columns(&self, field: Field) -> CoreResult<Vec<(&str, &[f64])>> {
        let cols: Vec<(&str, &[f64])> = self
            .columns
            .iter()
            .filter(|(k, _)| k.field == field)
            .map(|(k, v)| (k.ticker.as_str(), v.as_slice()))
            .collect();
        if cols.is_empty() {
            return Err(CoreError::MissingField { field });
        }
        Ok(cols)
    }

    /// Row position of `date`, if it is a trading date of this panel.
    pub fn row_index(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    pub fn value(&self, field: Field, ticker: &str, date: NaiveDate) -> Option<f64> {
        let row = self.row_index(date)?;
        self.column(field, ticker).map(|col| col[row])
    }

    /// Deterministic BLAKE3 hash over the date index and every column in key order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for date in &self.dates {
            hasher.update(date.to_string().as_bytes());
        }
        for (key, values) in &self.columns {
            hasher.update(key.field.to_string().as_bytes());
            hasher.update(key.ticker.as_bytes());
            for v in values {
                hasher.update(&v.to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}
