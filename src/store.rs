use crate::error::Result;
use crate::schema::{InventoryRecord, MovementRecord};
use log::{debug, info};
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Persistence of the reconciled movement table.
pub trait RecordStore {
    /// Every persisted record, in stored order. An absent table is empty.
    fn load(&self) -> Result<Vec<MovementRecord>>;

    /// Fully replaces the persisted table with `records`.
    fn replace(&self, records: &[MovementRecord]) -> Result<()>;
}

/// Movement table kept in a local CSV file, one header row plus one row per record.
#[derive(Debug, Clone)]
pub struct CsvRecordStore {
    path: PathBuf,
}

impl CsvRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for CsvRecordStore {
    fn load(&self) -> Result<Vec<MovementRecord>> {
        if !self.path.exists() {
            debug!("No stored table at {}", self.path.display());
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let records = reader
            .deserialize()
            .collect::<std::result::Result<Vec<MovementRecord>, csv::Error>>()?;

        info!("Loaded {} stored records from {}", records.len(), self.path.display());
        Ok(records)
    }

    fn replace(&self, records: &[MovementRecord]) -> Result<()> {
        write_csv_atomically(&self.path, records)?;
        info!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

/// Writes the inventory snapshot of a run as its own CSV table.
pub fn write_inventory_csv(path: &Path, records: &[InventoryRecord]) -> Result<()> {
    write_csv_atomically(path, records)?;
    info!("Wrote {} inventory rows to {}", records.len(), path.display());
    Ok(())
}

fn write_csv_atomically<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    {
        let mut writer = csv::Writer::from_writer(File::create(&tmp_path)?);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}
