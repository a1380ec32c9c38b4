//! Run artifacts on disk.
//!
//! `save_artifacts` writes one directory per run:
//! - `output.json`: summary, ranking and chart data
//! - `ranking.parquet`: the final ranked table (only when a ranking exists)
//! - `snapshots.parquet`: the price snapshot, one column per ticker

use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::{DataFrame, ParquetReader, ParquetWriter, SerReader};
use thiserror::Error;
use tracing::debug;

use rslab_core::CoreError;

use crate::pipeline::PipelineOutput;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Frame(#[from] CoreError),

    #[error("parquet error: {0}")]
    Parquet(String),
}

/// Paths written by [`save_artifacts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub output_json: PathBuf,
    pub ranking: Option<PathBuf>,
    pub snapshots: Option<PathBuf>,
}

/// Write the artifacts of `output` under `output_dir/<reference date>_<panel hash prefix>`.
pub fn save_artifacts(
    output: &PipelineOutput,
    output_dir: &Path,
) -> Result<ArtifactPaths, ExportError> {
    let hash = &output.summary.panel_hash;
    let dirname = format!(
        "{}_{}",
        output.summary.reference_date,
        &hash[..hash.len().min(12)]
    );
    let dir = output_dir.join(dirname);
    fs::create_dir_all(&dir).map_err(|source| ExportError::Io {
        path: dir.clone(),
        source,
    })?;

    let output_json = dir.join("output.json");
    fs::write(&output_json, output.to_json()?).map_err(|source| ExportError::Io {
        path: output_json.clone(),
        source,
    })?;

    let ranking = match &output.table {
        Some(table) => {
            let path = dir.join("ranking.parquet");
            write_parquet(&mut table.to_dataframe()?, &path)?;
            Some(path)
        }
        None => None,
    };
    let snapshots = match &output.charts.price_snapshots {
        Some(snapshot) => {
            let path = dir.join("snapshots.parquet");
            write_parquet(&mut snapshot.to_dataframe()?, &path)?;
            Some(path)
        }
        None => None,
    };

    debug!(dir = %dir.display(), "artifacts saved");
    Ok(ArtifactPaths {
        dir,
        output_json,
        ranking,
        snapshots,
    })
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), ExportError> {
    let file = fs::File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| ExportError::Parquet(format!("write {}: {e}", path.display())))?;
    Ok(())
}

/// Read a parquet artifact back.
pub fn read_parquet(path: &Path) -> Result<DataFrame, ExportError> {
    let file = fs::File::open(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| ExportError::Parquet(format!("read {}: {e}", path.display())))
}
