//! CSV export of classified datasets.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::models::{TrialDataset, TrialRow};

const FILE_SUFFIX: &str = "_clinical_trials_data.csv";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// File name for a dataset: conditions joined by `_`, path separators replaced.
pub fn export_file_name(conditions: &[String]) -> String {
    let stem = conditions
        .iter()
        .map(|c| c.replace(['/', '\\'], "-"))
        .collect::<Vec<_>>()
        .join("_");
    format!("{stem}{FILE_SUFFIX}")
}

/// Write rows as CSV with a header line, in column order.
pub fn write_csv<W: Write>(rows: &[TrialRow], writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    if rows.is_empty() {
        wtr.write_record(crate::models::COLUMNS)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `dataset` into `dir`, overwriting any previous export for the same
/// conditions. Returns the written path.
pub fn export_csv(dataset: &TrialDataset, dir: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(&dataset.conditions));
    let file = std::fs::File::create(&path)?;
    write_csv(&dataset.rows, file)?;
    info!(path = %path.display(), rows = dataset.len(), "Dataset exported");
    Ok(path)
}
