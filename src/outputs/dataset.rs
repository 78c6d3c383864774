//! CSV persistence for result records: final dataset and checkpoints.
//!
//! Every file is UTF-8 with a leading byte-order mark so spreadsheet tools
//! open Arabic and accented text correctly. The header row is always written,
//! even for an empty record set.
//!
//! # Output Structure
//!
//! ```text
//! checkpoint_dir/
//! ├── resultats_intermediaires_2025-05-06_10.csv
//! ├── resultats_intermediaires_2025-05-06_20.csv
//! └── ...
//! dataset_maladies_animales_final.csv
//! ```

use crate::models::Record;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{error, info, instrument};

/// UTF-8 byte-order mark.
pub const BOM: &str = "\u{feff}";

const CHECKPOINT_PREFIX: &str = "resultats_intermediaires";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize `records` to BOM-prefixed CSV bytes, header first.
pub fn encode_records(records: &[Record]) -> Result<Vec<u8>, StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BOM.as_bytes().to_vec());
    writer.write_record(Record::COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.into_inner().map_err(|e| StoreError::Io(e.into_error()))
}

/// Parse records from CSV text, tolerating a leading byte-order mark.
pub fn decode_records(text: &str) -> Result<Vec<Record>, StoreError> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let records = reader.deserialize().collect::<Result<Vec<Record>, _>>()?;
    Ok(records)
}

/// Write `records` to `path`, creating parent directories as needed.
#[instrument(level = "info", skip_all, fields(path = %path.display(), rows = records.len()))]
pub async fn write_records(records: &[Record], path: &Path) -> Result<(), StoreError> {
    let bytes = encode_records(records)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create output dir");
            return Err(e.into());
        }
    }
    fs::write(path, bytes).await?;
    info!("Wrote CSV");
    Ok(())
}

pub async fn read_records(path: &Path) -> Result<Vec<Record>, StoreError> {
    let text = fs::read_to_string(path).await?;
    decode_records(&text)
}

/// Where checkpoints of one run are written.
///
/// Checkpoint files are named by run date and the number of processed
/// tasks, so successive checkpoints never overwrite each other.
#[derive(Debug, Clone)]
pub struct ResultStore {
    checkpoint_dir: PathBuf,
    run_date: NaiveDate,
}

impl ResultStore {
    pub fn new(checkpoint_dir: impl Into<PathBuf>, run_date: NaiveDate) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            run_date,
        }
    }

    pub fn checkpoint_path(&self, processed: usize) -> PathBuf {
        self.checkpoint_dir.join(format!(
            "{}_{}_{}.csv",
            CHECKPOINT_PREFIX,
            self.run_date.format("%Y-%m-%d"),
            processed
        ))
    }

    /// Write every record accumulated so far to the next checkpoint file.
    pub async fn checkpoint(&self, records: &[Record]) -> Result<PathBuf, StoreError> {
        let path = self.checkpoint_path(records.len());
        write_records(records, &path).await?;
        info!(path = %path.display(), processed = records.len(), "Checkpoint saved");
        Ok(path)
    }
}
