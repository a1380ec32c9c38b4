//! Serializable pipeline configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rslab_core::indicators::IndicatorParams;
use rslab_core::ranking::{RankOrder, RankingOptions};
use rslab_core::risk::RiskColumns;
use rslab_core::scoring::{ScoreMethod, SCORE_COLUMN};
use rslab_core::Field;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Months of history scored; the snapshot has `analysis_months + 1` dates.
    pub analysis_months: usize,
    /// Calendar days between theoretical rebalance dates.
    pub spacing_days: i64,
    /// Field snapshotted and scored.
    pub price_field: Field,
    /// Field the SMA, Bollinger and MACD indicators read.
    pub indicator_source: Field,

    pub sma_window: usize,
    pub bollinger_window: usize,
    pub bollinger_k: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_window: usize,
    pub atr_multiplier: f64,

    pub score_method: ScoreMethod,
    /// Minimum `FR_rank` kept in the ranking.
    pub min_fr_rank: f64,
    pub top_n: Option<usize>,
    /// Lower weighted scores mean stronger uptrends, so they rank first.
    pub rank_order: RankOrder,
    /// Extra scored-frame columns copied into each ranked entry.
    pub payload_fields: Vec<String>,

    /// Enrichment column holding the 52-week high.
    pub high_52w_column: String,
    pub risk_decimals: u32,

    /// Reference dates kept by the panel cache.
    pub cache_capacity: usize,
    /// Calendar days of history fetched before the oldest theoretical date.
    pub warmup_days: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            analysis_months: 6,
            spacing_days: 30,
            price_field: Field::AdjClose,
            indicator_source: Field::AdjClose,
            sma_window: 20,
            bollinger_window: 20,
            bollinger_k: 2.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr_window: 14,
            atr_multiplier: 1.5,
            score_method: ScoreMethod::WeightedRelativeStrength,
            min_fr_rank: 80.0,
            top_n: None,
            rank_order: RankOrder::Ascending,
            payload_fields: Vec::new(),
            high_52w_column: "high_52w".to_string(),
            risk_decimals: 2,
            cache_capacity: 8,
            warmup_days: 60,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Number of snapshot dates.
    pub fn periods(&self) -> usize {
        self.analysis_months + 1
    }

    pub fn stop_field(&self) -> Field {
        Field::stop_atr(self.atr_window, self.atr_multiplier)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let windows = [
            ("sma_window", self.sma_window),
            ("bollinger_window", self.bollinger_window),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("atr_window", self.atr_window),
        ];
        for (name, value) in windows {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be >= 1")));
            }
        }
        if self.macd_fast >= self.macd_slow {
            return Err(ConfigError::Invalid(format!(
                "macd_fast ({}) must be less than macd_slow ({})",
                self.macd_fast, self.macd_slow
            )));
        }
        if self.periods() < 2 {
            return Err(ConfigError::Invalid(
                "analysis_months must be >= 1 (two snapshot dates)".into(),
            ));
        }
        if self.spacing_days < 1 {
            return Err(ConfigError::Invalid("spacing_days must be >= 1".into()));
        }
        if self.warmup_days < 0 {
            return Err(ConfigError::Invalid("warmup_days must be >= 0".into()));
        }
        for (name, value) in [
            ("bollinger_k", self.bollinger_k),
            ("atr_multiplier", self.atr_multiplier),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        if !(0.0..=100.0).contains(&self.min_fr_rank) {
            return Err(ConfigError::Invalid(format!(
                "min_fr_rank must be within [0, 100], got {}",
                self.min_fr_rank
            )));
        }
        if self.top_n == Some(0) {
            return Err(ConfigError::Invalid("top_n must be >= 1 when set".into()));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid("cache_capacity must be >= 1".into()));
        }
        if self.price_field.is_indicator() || self.indicator_source.is_indicator() {
            return Err(ConfigError::Invalid(
                "price_field and indicator_source must be raw price fields".into(),
            ));
        }
        Ok(())
    }

    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams {
            source: self.indicator_source,
            sma_window: self.sma_window,
            bollinger_window: self.bollinger_window,
            bollinger_k: self.bollinger_k,
            macd_fast: self.macd_fast,
            macd_slow: self.macd_slow,
            macd_signal: self.macd_signal,
            atr_window: self.atr_window,
            atr_multiplier: self.atr_multiplier,
        }
    }

    pub fn ranking_options(&self) -> RankingOptions {
        RankingOptions {
            score_column: SCORE_COLUMN.to_string(),
            min_score: self.min_fr_rank,
            top_n: self.top_n,
            payload_fields: self.payload_fields.clone(),
            order: self.rank_order,
        }
    }

    pub fn risk_columns(&self) -> RiskColumns {
        RiskColumns {
            high_52w: self.high_52w_column.clone(),
            ..RiskColumns::for_stop(self.stop_field())
        }
    }

    /// Deterministic BLAKE3 hash of the configuration.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let text = self.to_toml()?;
        Ok(blake3::hash(text.as_bytes()).to_hex().to_string())
    }
}
