//! rslab core: relative-strength ranking over a multi-asset price panel.
//!
//! Pure computation, no I/O:
//! - Domain types (price bars, panel fields, the (Field, Ticker) panel)
//! - Theoretical rebalance dates and trading-date resolution
//! - Panel-wide indicators (SMA, Bollinger, MACD, ATR, Stop-ATR)
//! - Snapshot extraction and flattening
//! - Weighted relative-strength scoring
//! - Ordinal percentile ranking with filtering and truncation
//! - Risk/return augmentation of the ranked frame

pub mod data;
pub mod dates;
pub mod domain;
pub mod error;
pub mod finite;
pub mod frame;
pub mod indicators;
pub mod ranking;
pub mod risk;
pub mod scoring;
pub mod snapshot;

pub use dates::{download_window, generate_theoretical_dates, resolve_to_trading_dates};
pub use domain::{ColumnKey, Field, Panel, PriceBar};
pub use error::{CoreError, CoreResult};
pub use frame::{TickerFrame, Value};
pub use indicators::{IndicatorEngine, IndicatorParams};
pub use ranking::{build_ranking, RankOrder, RankedEntry, Ranking, RankingOptions};
pub use risk::{calculate_risk_return, RiskColumns};
pub use scoring::{calculate_relative_strength, score_frame, ScoreMethod};
pub use snapshot::{
    extract_latest, extract_price_snapshots, flatten_snapshot_for_scoring, FlatScoreFrame,
    Snapshot,
};
