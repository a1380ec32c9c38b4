//! Error taxonomy shared by every core transform.
//!
//! All variants signal a caller contract violation and are never recovered
//! locally. Empty results are not errors; the runner reports them as a
//! pipeline outcome.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::Field;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Malformed or missing index/column shape.
    #[error("structural error: {0}")]
    Structural(String),

    /// A column was supplied with a length different from the date index.
    #[error("column {column} has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// The (field, ticker) pair already exists; panels are additive only.
    #[error("column {field}/{ticker} already exists")]
    DuplicateColumn { field: Field, ticker: String },

    /// A required panel field is absent.
    #[error("configuration error: field '{field}' not found in panel")]
    MissingField { field: Field },

    /// A requested table column, window or parameter is absent or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No available trading date precedes a theoretical date.
    #[error("no market data on or before {date}")]
    NoTradingDate { date: NaiveDate },

    /// Export to a polars DataFrame failed.
    #[error("dataframe export failed: {0}")]
    Frame(String),
}

impl CoreError {
    pub fn structural(msg: impl Into<String>) -> Self {
        Self::Structural(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// True for the structural family (shape, length, duplicate key).
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Structural(_) | Self::LengthMismatch { .. } | Self::DuplicateColumn { .. }
        )
    }

    /// True for the configuration family (missing field, bad parameter).
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingField { .. } | Self::Configuration(_))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
