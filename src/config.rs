use crate::classifier::ClassificationTables;
use crate::error::{MovementHistoryError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_INVENTORY_KEYWORD: &str = "ppReport1inventario";

fn default_inventory_keyword() -> String {
    DEFAULT_INVENTORY_KEYWORD.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PipelineConfig {
    #[schemars(
        description = "Folder holding the exported reports: one inventory report and any number of movement reports."
    )]
    pub reports_dir: PathBuf,

    #[schemars(
        description = "Substring identifying the inventory report by file name. Exactly one file in reports_dir may contain it."
    )]
    #[serde(default = "default_inventory_keyword")]
    pub inventory_keyword: String,

    #[schemars(description = "CSV file holding the reconciled movement table. Fully rewritten on every run.")]
    pub store_path: PathBuf,

    #[schemars(description = "Optional CSV file receiving the parsed inventory snapshot of the run.")]
    #[serde(default)]
    pub inventory_store_path: Option<PathBuf>,

    #[schemars(
        description = "Operation-type classification tables. When omitted, the tables shipped in config/classification.json are used."
    )]
    #[serde(default)]
    pub classification: Option<ClassificationTables>,
}

impl PipelineConfig {
    pub fn new(reports_dir: impl Into<PathBuf>, store_path: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
            inventory_keyword: default_inventory_keyword(),
            store_path: store_path.into(),
            inventory_store_path: None,
            classification: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inventory_keyword.trim().is_empty() {
            return Err(MovementHistoryError::ConfigError(
                "inventory_keyword must not be empty".to_string(),
            ));
        }
        if self.store_path.as_os_str().is_empty() {
            return Err(MovementHistoryError::ConfigError(
                "store_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn classification_tables(&self) -> Result<ClassificationTables> {
        match &self.classification {
            Some(tables) => Ok(tables.clone()),
            None => ClassificationTables::builtin(),
        }
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PipelineConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
