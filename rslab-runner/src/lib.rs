//! rslab runner: pipeline orchestration on top of `rslab-core`.
//!
//! - TOML pipeline configuration
//! - panel providers (long-format CSV, synthetic random walks)
//! - enrichment seam for per-ticker side data
//! - bounded panel cache keyed by reference date
//! - the canonical ranking pipeline and its serializable output
//! - JSON and parquet run artifacts

pub mod cache;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod pipeline;
pub mod provider;

pub use cache::PanelCache;
pub use config::{ConfigError, PipelineConfig};
pub use data_loader::{
    load_panel_csv, panel_from_bars, read_bars_csv, synthetic_panel, CsvPanelProvider, LoadError,
    SyntheticPanelProvider,
};
pub use export::{read_parquet, save_artifacts, ArtifactPaths, ExportError};
pub use pipeline::{
    run_pipeline, Charts, Pipeline, PipelineError, PipelineOutput, PipelineStatus, Summary,
};
pub use provider::{Enrichment, EnrichmentError, NoEnrichment, PanelProvider, StaticEnrichment};
