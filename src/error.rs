use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MovementHistoryError {
    #[error("No inventory report containing '{keyword}' was found in {dir}")]
    InventoryFileNotFound { dir: PathBuf, keyword: String },

    #[error("{} inventory reports contain '{keyword}': {candidates:?}", .candidates.len())]
    AmbiguousInventoryFile {
        keyword: String,
        candidates: Vec<PathBuf>,
    },

    #[error("No movement reports were found in {0}")]
    NoMovementFiles(PathBuf),

    #[error("Could not read inventory report {path}: {details}")]
    InventoryExtraction { path: PathBuf, details: String },

    #[error("Text extraction failed for {path}: {details}")]
    TextExtraction { path: PathBuf, details: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MovementHistoryError>;
