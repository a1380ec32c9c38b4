//! The canonical ranking pipeline.
//!
//! `run_pipeline` takes an already-loaded panel and a reference date:
//! 1. indicators are appended to the panel
//! 2. theoretical dates are generated and resolved to trading dates
//! 3. the price field is snapshotted at those dates and flattened
//! 4. tickers are scored, then ranked, filtered and truncated
//! 5. ranked tickers are joined with their latest price/stop and the
//!    enrichment side data, and the risk/return metrics are added
//!
//! Empty universes, empty histories and stages that leave no assets are not
//! errors: they return an empty ranking with a summary message.
//!
//! [`Pipeline`] wraps `run_pipeline` with a panel provider and the bounded
//! panel cache keyed by reference date.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use rslab_core::dates::{download_window, generate_theoretical_dates, resolve_to_trading_dates};
use rslab_core::frame::TICKER_COLUMN;
use rslab_core::ranking::{build_ranking, RankedEntry, RANK_COLUMN};
use rslab_core::risk::{
    calculate_risk_return, DISTANCE_COLUMN, RETURN_OVER_RISK_COLUMN, RISK_COLUMN,
};
use rslab_core::scoring::{score_frame, SCORE_COLUMN};
use rslab_core::snapshot::{extract_latest, extract_price_snapshots, flatten_snapshot_for_scoring};
use rslab_core::{CoreError, IndicatorEngine, Panel, Snapshot, TickerFrame, Value};

use crate::cache::PanelCache;
use crate::config::{ConfigError, PipelineConfig};
use crate::data_loader::LoadError;
use crate::provider::{Enrichment, EnrichmentError, PanelProvider};

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Enrichment(#[from] EnrichmentError),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Ok,
    EmptyUniverse,
    EmptyHistory,
    NoScoredAssets,
    NoRankedAssets,
}

impl PipelineStatus {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            PipelineStatus::Ok => None,
            PipelineStatus::EmptyUniverse => Some("no assets found in the universe"),
            PipelineStatus::EmptyHistory => Some("price history is empty"),
            PipelineStatus::NoScoredAssets => Some("no assets could be scored"),
            PipelineStatus::NoRankedAssets => Some("no assets passed the ranking filters"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub status: PipelineStatus,
    pub reference_date: NaiveDate,
    pub resolved_dates: Vec<NaiveDate>,
    /// Trading date the latest price, stop and risk metrics were read at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_date: Option<NaiveDate>,
    pub total_universe: usize,
    pub scored_assets: usize,
    pub ranked_assets: usize,
    pub panel_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Charts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_snapshots: Option<Snapshot>,
}

/// Result of one run: `{summary, ranking, charts}` when serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub summary: Summary,
    pub ranking: Vec<RankedEntry>,
    pub charts: Charts,
    /// Final ranked table (scores, ranks, latest price/stop, enrichment,
    /// risk metrics), in ranking order.
    #[serde(skip)]
    pub table: Option<TickerFrame>,
}

impl PipelineOutput {
    fn empty(status: PipelineStatus, summary: Summary) -> Self {
        let message = status.message().map(str::to_string);
        info!(?status, "pipeline finished without a ranking");
        Self {
            summary: Summary {
                message,
                status,
                ..summary
            },
            ranking: Vec::new(),
            charts: Charts::default(),
            table: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranking.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Run the pipeline over `panel` for `reference_date`.
pub fn run_pipeline(
    panel: &Panel,
    reference_date: NaiveDate,
    config: &PipelineConfig,
    enrichment: &dyn Enrichment,
) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;

    let tickers = panel.tickers();
    let mut summary = Summary {
        message: None,
        status: PipelineStatus::Ok,
        reference_date,
        resolved_dates: Vec::new(),
        latest_date: None,
        total_universe: tickers.len(),
        scored_assets: 0,
        ranked_assets: 0,
        panel_hash: panel.fingerprint(),
    };
    if tickers.is_empty() {
        return Ok(PipelineOutput::empty(PipelineStatus::EmptyUniverse, summary));
    }
    if panel.is_empty() {
        return Ok(PipelineOutput::empty(PipelineStatus::EmptyHistory, summary));
    }

    // 1. Indicators.
    let engine = IndicatorEngine::from_params(&config.indicator_params())?;
    let enriched_panel = engine.apply(panel)?;
    debug!(
        columns = enriched_panel.column_count(),
        indicators = engine.len(),
        "indicators computed"
    );

    // 2. Dates.
    let theoretical =
        generate_theoretical_dates(reference_date, config.periods(), config.spacing_days);
    let resolved = resolve_to_trading_dates(enriched_panel.dates(), &theoretical)?;
    debug!(resolved = ?resolved, "rebalance dates resolved");
    summary.resolved_dates = resolved.clone();

    // 3. Snapshot.
    let snapshot = extract_price_snapshots(&enriched_panel, &resolved, config.price_field)?;
    let flat = flatten_snapshot_for_scoring(&snapshot, config.price_field)?;

    // 4. Score and rank.
    let scored = score_frame(&flat, config.score_method)?;
    summary.scored_assets = scored
        .numeric(SCORE_COLUMN)?
        .iter()
        .filter(|s| s.is_finite())
        .count();
    if summary.scored_assets == 0 {
        return Ok(PipelineOutput::empty(PipelineStatus::NoScoredAssets, summary));
    }

    let ranking = build_ranking(&scored, &config.ranking_options())?;
    summary.ranked_assets = ranking.len();
    if ranking.is_empty() {
        return Ok(PipelineOutput::empty(PipelineStatus::NoRankedAssets, summary));
    }

    // 5. Latest price/stop as of the reference trading date, enrichment, risk.
    let as_of = resolve_to_trading_dates(enriched_panel.dates(), &[reference_date])?[0];
    summary.latest_date = Some(as_of);
    let ranked_tickers: Vec<String> = ranking.entries.iter().map(|e| e.ticker.clone()).collect();
    let latest = extract_latest(
        &enriched_panel,
        as_of,
        config.price_field,
        &[config.stop_field()],
    )?;
    let side = enrichment.enrich(&ranked_tickers)?;

    let mut keep: Vec<&str> = vec![SCORE_COLUMN, RANK_COLUMN];
    keep.extend(
        config
            .payload_fields
            .iter()
            .map(String::as_str)
            .filter(|f| !matches!(*f, TICKER_COLUMN | SCORE_COLUMN | RANK_COLUMN)),
    );
    let table = ranking.frame.select(&keep)?.left_join(&latest)?;
    let side = drop_colliding_columns(&side, &table)?;
    let mut table = table.left_join(&side)?;

    let risk_columns = config.risk_columns();
    if !table.has_column(&risk_columns.high_52w) {
        warn!(
            column = %risk_columns.high_52w,
            "enrichment has no 52-week high; distance and return/risk are undefined"
        );
        table.add_column(risk_columns.high_52w.clone(), vec![Value::Null; table.len()])?;
    }
    let table = calculate_risk_return(&table, &risk_columns, config.risk_decimals)?;

    let entries = merge_entries(ranking.entries, &table, &keep);
    info!(
        %reference_date,
        universe = summary.total_universe,
        scored = summary.scored_assets,
        ranked = summary.ranked_assets,
        "pipeline complete"
    );
    Ok(PipelineOutput {
        summary,
        ranking: entries,
        charts: Charts {
            price_snapshots: Some(snapshot),
        },
        table: Some(table),
    })
}

/// Side data may not overwrite pipeline columns: colliding enrichment columns
/// (and the risk output names) are dropped with a warning.
fn drop_colliding_columns(
    side: &TickerFrame,
    table: &TickerFrame,
) -> Result<TickerFrame, PipelineError> {
    let reserved = [DISTANCE_COLUMN, RISK_COLUMN, RETURN_OVER_RISK_COLUMN];
    let (kept, dropped): (Vec<&str>, Vec<&str>) = side
        .column_names()
        .into_iter()
        .partition(|c| !table.has_column(c) && !reserved.contains(c));
    if !dropped.is_empty() {
        warn!(columns = ?dropped, "enrichment columns clash with pipeline columns; dropped");
    }
    Ok(side.select(&kept)?)
}

/// Copy every table column not already carried by the entries (score, rank,
/// payload fields) into each entry's extra fields.
fn merge_entries(entries: Vec<RankedEntry>, table: &TickerFrame, skip: &[&str]) -> Vec<RankedEntry> {
    let extra_columns: Vec<&str> = table
        .column_names()
        .into_iter()
        .filter(|c| !skip.contains(c))
        .collect();
    entries
        .into_iter()
        .enumerate()
        .map(|(row, mut entry)| {
            let extra: BTreeMap<String, Value> = extra_columns
                .iter()
                .map(|c| (c.to_string(), table.value(row, c).unwrap_or(Value::Null)))
                .collect();
            entry.extra.extend(extra);
            entry
        })
        .collect()
}

/// Pipeline bound to a configuration and a panel cache.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    cache: PanelCache,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let cache = PanelCache::new(config.cache_capacity);
        Ok(Self { config, cache })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &PanelCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut PanelCache {
        &mut self.cache
    }

    /// Panel for `reference_date`, from the cache or loaded through
    /// `provider` over the download window and cached.
    pub fn panel_for(
        &mut self,
        reference_date: NaiveDate,
        provider: &dyn PanelProvider,
    ) -> Result<Arc<Panel>, PipelineError> {
        if let Some(panel) = self.cache.get(reference_date) {
            return Ok(panel);
        }
        let theoretical = generate_theoretical_dates(
            reference_date,
            self.config.periods(),
            self.config.spacing_days,
        );
        let (start, end) = download_window(&theoretical, self.config.warmup_days)?;
        debug!(provider = provider.name(), %start, %end, "loading panel");
        let panel = Arc::new(provider.load(start, end)?);
        self.cache.insert_shared(reference_date, Arc::clone(&panel));
        Ok(panel)
    }

    pub fn run(
        &mut self,
        reference_date: NaiveDate,
        provider: &dyn PanelProvider,
        enrichment: &dyn Enrichment,
    ) -> Result<PipelineOutput, PipelineError> {
        let panel = self.panel_for(reference_date, provider)?;
        run_pipeline(&panel, reference_date, &self.config, enrichment)
    }
}
