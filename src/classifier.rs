use crate::error::{MovementHistoryError, Result};
use crate::schema::{Direction, StatementCategory};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

const BUILTIN_TABLES: &str = include_str!("../config/classification.json");

/// Operation-code lookup tables, keyed by the operation type exactly as the ERP prints
/// it (`"<code>-<description>"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClassificationTables {
    #[schemars(description = "Operation type -> stock direction (Entrada, Saída, Sem Movimentação)")]
    #[serde(default)]
    pub directions: BTreeMap<String, Direction>,

    #[schemars(description = "Operation type -> income statement category (Receita, Custo, Despesa, ...)")]
    #[serde(default)]
    pub categories: BTreeMap<String, StatementCategory>,
}

impl ClassificationTables {
    /// The tables shipped with the crate in `config/classification.json`.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_TABLES)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            MovementHistoryError::ConfigError(format!("invalid classification tables: {}", e))
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Maps operation types to a direction and a statement category.
/// Codes missing from a table fall back to the `Unclassified` variant of that table.
#[derive(Debug, Clone)]
pub struct MovementClassifier {
    directions: HashMap<String, Direction>,
    categories: HashMap<String, StatementCategory>,
}

impl MovementClassifier {
    pub fn new(tables: ClassificationTables) -> Self {
        Self {
            directions: tables
                .directions
                .into_iter()
                .map(|(code, direction)| (code.trim().to_string(), direction))
                .collect(),
            categories: tables
                .categories
                .into_iter()
                .map(|(code, category)| (code.trim().to_string(), category))
                .collect(),
        }
    }

    pub fn direction(&self, operation_type: &str) -> Direction {
        self.directions
            .get(operation_type.trim())
            .copied()
            .unwrap_or(Direction::Unclassified)
    }

    pub fn category(&self, operation_type: &str) -> StatementCategory {
        self.categories
            .get(operation_type.trim())
            .copied()
            .unwrap_or(StatementCategory::Unclassified)
    }

    pub fn classify(&self, operation_type: &str) -> (Direction, StatementCategory) {
        (self.direction(operation_type), self.category(operation_type))
    }
}
