//! Seams to the external collaborators of the pipeline.
//!
//! - [`PanelProvider`]: supplies a price panel covering a calendar window.
//! - [`Enrichment`]: supplies per-ticker side data (name, sector, 52-week
//!   high, ...) joined onto the ranking by ticker.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use thiserror::Error;

use rslab_core::{CoreError, Panel, TickerFrame, Value};

use crate::data_loader::LoadError;

/// Errors from an enrichment collaborator.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("enrichment source unavailable: {0}")]
    Unavailable(String),

    #[error("enrichment frame is malformed: {0}")]
    Frame(#[from] CoreError),
}

/// Market-data collaborator.
pub trait PanelProvider {
    /// Human-readable name (e.g., "csv", "synthetic").
    fn name(&self) -> &str;

    /// Panel with every available trading date in `[start, end)`.
    fn load(&self, start: NaiveDate, end: NaiveDate) -> Result<Panel, LoadError>;
}

/// Side-data collaborator.
pub trait Enrichment {
    /// One row per known ticker; unknown tickers may be omitted and are
    /// filled with nulls by the join.
    fn enrich(&self, tickers: &[String]) -> Result<TickerFrame, EnrichmentError>;
}

/// Enrichment that adds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnrichment;

impl Enrichment for NoEnrichment {
    fn enrich(&self, tickers: &[String]) -> Result<TickerFrame, EnrichmentError> {
        Ok(TickerFrame::new(tickers.to_vec())?)
    }
}

/// In-memory side data keyed by ticker.
#[derive(Debug, Clone, Default)]
pub struct StaticEnrichment {
    columns: Vec<String>,
    rows: BTreeMap<String, BTreeMap<String, Value>>,
}

impl StaticEnrichment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one cell; columns are created on first use.
    pub fn set(&mut self, ticker: &str, column: &str, value: impl Into<Value>) {
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_string());
        }
        self.rows
            .entry(ticker.to_string())
            .or_default()
            .insert(column.to_string(), value.into());
    }

    pub fn with(mut self, ticker: &str, column: &str, value: impl Into<Value>) -> Self {
        self.set(ticker, column, value);
        self
    }

    /// Parse `{"TICKER": {"column": value, ...}, ...}`.
    pub fn from_json(text: &str) -> Result<Self, EnrichmentError> {
        let rows: BTreeMap<String, BTreeMap<String, Value>> = serde_json::from_str(text)
            .map_err(|e| EnrichmentError::Unavailable(format!("invalid enrichment JSON: {e}")))?;
        let mut out = Self::new();
        for (ticker, cells) in rows {
            for (column, value) in cells {
                out.set(&ticker, &column, value);
            }
        }
        Ok(out)
    }
}

impl Enrichment for StaticEnrichment {
    fn enrich(&self, tickers: &[String]) -> Result<TickerFrame, EnrichmentError> {
        let known: Vec<String> = tickers
            .iter()
            .filter(|t| self.rows.contains_key(*t))
            .cloned()
            .collect();
        let mut frame = TickerFrame::new(known)?;
        for column in &self.columns {
            let values = frame
                .tickers()
                .iter()
                .map(|t| {
                    self.rows
                        .get(t)
                        .and_then(|row| row.get(column))
                        .cloned()
                        .unwrap_or(Value::Null)
                })
                .collect();
            frame.add_column(column.clone(), values)?;
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_enrichment_returns_known_tickers() {
        let source = StaticEnrichment::new()
            .with("PETR4", "sector", "Energy")
            .with("PETR4", "high_52w", 42.0)
            .with("VALE3", "sector", "Mining");
        let frame = source
            .enrich(&["VALE3".to_string(), "XXXX3".to_string(), "PETR4".to_string()])
            .unwrap();
        assert_eq!(frame.tickers(), &["VALE3".to_string(), "PETR4".to_string()]);
        assert_eq!(frame.column_names(), vec!["sector", "high_52w"]);
        assert_eq!(frame.column("high_52w").unwrap()[0], Value::Null);
        assert_eq!(frame.column("high_52w").unwrap()[1], Value::Number(42.0));
    }

    #[test]
    fn from_json() {
        let source =
            StaticEnrichment::from_json(r#"{"ITUB4": {"name": "Itau", "high_52w": 40.5}}"#)
                .unwrap();
        let frame = source.enrich(&["ITUB4".to_string()]).unwrap();
        assert_eq!(frame.column("name").unwrap()[0], Value::from("Itau"));
        assert!(StaticEnrichment::from_json("not json").is_err());
    }

    #[test]
    fn no_enrichment_is_empty() {
        let frame = NoEnrichment.enrich(&["A".to_string()]).unwrap();
        assert_eq!(frame.len(), 1);
        assert!(frame.column_names().is_empty());
    }
}
