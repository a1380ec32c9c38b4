//! Ordinal percentile ranking of scored tickers.
//!
//! `build_ranking` drops undefined scores, stable-sorts the rest, assigns
//! `FR_rank = (n - i) / n * 100` (i = 0-based position after sorting, so the
//! top row gets 100 and the last gets 100/n), filters on the rank, truncates
//! and emits [`RankedEntry`] values. Ties keep their pre-sort row order, so
//! every row gets a distinct rank and the output is deterministic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::finite::{round_to, serialize_f64};
use crate::frame::{TickerFrame, Value, TICKER_COLUMN};
use crate::scoring::SCORE_COLUMN;

/// Name of the rank column added to the ranked frame.
pub const RANK_COLUMN: &str = "FR_rank";

/// Which end of the score scale ranks first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RankOrder {
    /// Highest score first.
    #[default]
    Descending,
    /// Lowest score first.
    Ascending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingOptions {
    pub score_column: String,
    /// Minimum `FR_rank` (not raw score) a row needs to be kept.
    pub min_score: f64,
    pub top_n: Option<usize>,
    /// Extra frame columns copied into each entry.
    pub payload_fields: Vec<String>,
    pub order: RankOrder,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self {
            score_column: SCORE_COLUMN.to_string(),
            min_score: 0.0,
            top_n: None,
            payload_fields: Vec::new(),
            order: RankOrder::Descending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub ticker: String,
    #[serde(rename = "FR", serialize_with = "serialize_f64")]
    pub score: f64,
    #[serde(rename = "FR_rank")]
    pub rank: f64,
    /// Requested payload fields and, later, enrichment columns.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Ranked rows as a frame (score and `FR_rank` columns included) and as entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub frame: TickerFrame,
    pub entries: Vec<RankedEntry>,
}

impl Ranking {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.ticker.as_str()).collect()
    }
}

pub fn build_ranking(frame: &TickerFrame, options: &RankingOptions) -> CoreResult<Ranking> {
    let scores = frame.numeric(&options.score_column)?;
    // Ticker, score and rank are always emitted, so they are valid payload names.
    for field in &options.payload_fields {
        if !is_core_field(field, &options.score_column) && !frame.has_column(field) {
            return Err(CoreError::configuration(format!(
                "payload field '{field}' not found"
            )));
        }
    }

    // 1. Drop undefined scores.
    let mut rows: Vec<usize> = (0..frame.len()).filter(|&i| scores[i].is_finite()).collect();
    let dropped = frame.len() - rows.len();
    if dropped > 0 {
        warn!(dropped, "tickers without a defined score left out of the ranking");
    }

    // 2. Stable sort.
    match options.order {
        RankOrder::Descending => rows.sort_by(|&a, &b| scores[b].total_cmp(&scores[a])),
        RankOrder::Ascending => rows.sort_by(|&a, &b| scores[a].total_cmp(&scores[b])),
    }

    // 3. Ordinal percentile rank.
    let n = rows.len();
    let ranks: Vec<f64> = (0..n)
        .map(|i| round_to((n - i) as f64 / n as f64 * 100.0, 2))
        .collect();

    // 4. Filter on rank, 5. truncate.
    let mut kept: Vec<(usize, f64)> = rows
        .into_iter()
        .zip(ranks)
        .filter(|(_, rank)| *rank >= options.min_score)
        .collect();
    if let Some(top_n) = options.top_n {
        kept.truncate(top_n);
    }

    let order: Vec<usize> = kept.iter().map(|(row, _)| *row).collect();
    let mut ranked = frame.take_rows(&order);
    ranked.add_numeric(RANK_COLUMN, kept.iter().map(|(_, rank)| *rank).collect())?;

    // 6. Entries.
    let entries = kept
        .iter()
        .enumerate()
        .map(|(pos, &(row, rank))| {
            let extra = options
                .payload_fields
                .iter()
                .filter(|f| !is_core_field(f, &options.score_column))
                .map(|f| (f.clone(), ranked.value(pos, f).unwrap_or(Value::Null)))
                .collect();
            RankedEntry {
                ticker: frame.tickers()[row].clone(),
                score: scores[row],
                rank,
                extra,
            }
        })
        .collect::<Vec<_>>();

    debug!(
        scored = n,
        ranked = entries.len(),
        min_score = options.min_score,
        "ranking built"
    );
    Ok(Ranking {
        frame: ranked,
        entries,
    })
}

fn is_core_field(name: &str, score_column: &str) -> bool {
    name == TICKER_COLUMN || name == score_column || name == RANK_COLUMN || name == SCORE_COLUMN
}
