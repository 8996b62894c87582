//! # Movement History Builder
//!
//! A library for turning the text of ERP-exported "movement by note" reports and an
//! inventory valuation report into a clean, classified, cost-enriched table of stock
//! movement lines.
//!
//! ## Core Concepts
//!
//! - **Note Block**: The region of a movement report describing one fiscal note
//! - **Movement Line**: One item row of a note, carrying the note's header fields
//! - **Direction**: Whether the operation moves goods in, out, or not at all
//! - **DRE Category**: Where the operation lands on the income statement
//! - **Reconciliation**: Joining movement lines to inventory unit costs by item description
//! - **Incremental Merge**: Unioning a new batch with the stored table, newest record wins
//!
//! ## Example
//!
//! ```rust,ignore
//! use movement_history_builder::*;
//!
//! let config = PipelineConfig::new("/data/relatorios", "/data/movimentacoes.csv");
//! let pipeline = MovementPipeline::new(config.clone(), PlainTextSource)?;
//! let store = CsvRecordStore::new(&config.store_path);
//!
//! let summary = pipeline.sync(&store)?;
//! println!("{} records stored", summary.stored_after);
//! ```

pub mod blocks;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod ingestion;
pub mod inventory;
pub mod merge;
pub mod schema;
pub mod statement;
pub mod store;
pub mod utils;

pub use blocks::{note_blocks, NoteBlocks};
pub use classifier::{ClassificationTables, MovementClassifier};
pub use config::{PipelineConfig, DEFAULT_INVENTORY_KEYWORD};
pub use engine::{Reconciliation, ReconciliationEngine, ReconciliationWarning};
pub use error::{MovementHistoryError, Result};
pub use extractor::{extract_block, extract_document, PaymentPattern, PaymentTerms};
pub use ingestion::*;
pub use inventory::{parse_inventory_line, parse_inventory_page, parse_inventory_pages, InventoryValuation};
pub use merge::{merge_records, ExtractionWindow, MergeOutcome};
pub use schema::*;
pub use statement::{DirectionTotals, IncomeStatement};
pub use store::{write_inventory_csv, CsvRecordStore, RecordStore};
pub use utils::*;

use chrono::NaiveDate;
use log::{debug, info, warn};
use std::path::PathBuf;

/// Everything one extraction run produced.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub records: Vec<MovementRecord>,
    pub inventory: Vec<InventoryRecord>,
    pub skipped_files: Vec<PathBuf>,
    pub warnings: Vec<ReconciliationWarning>,
    /// Movement lines that found no inventory cost.
    pub unmatched: usize,
}

impl RunOutcome {
    pub fn inventory_valuation(&self) -> InventoryValuation {
        InventoryValuation::from_records(&self.inventory)
    }

    pub fn statement(&self) -> IncomeStatement {
        IncomeStatement::from_records(&self.records)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    pub new_records: usize,
    pub stored_before: usize,
    pub stored_after: usize,
    pub duplicates_removed: usize,
    pub skipped_files: Vec<PathBuf>,
    pub warnings: Vec<ReconciliationWarning>,
    pub unmatched: usize,
    /// False when the run produced no record and the store was left untouched.
    pub written: bool,
}

impl SyncSummary {
    fn from_outcome(outcome: &RunOutcome) -> Self {
        Self {
            new_records: outcome.records.len(),
            skipped_files: outcome.skipped_files.clone(),
            warnings: outcome.warnings.clone(),
            unmatched: outcome.unmatched,
            ..Self::default()
        }
    }
}

pub struct MovementPipeline<S: TextSource> {
    config: PipelineConfig,
    source: S,
    classifier: MovementClassifier,
}

impl<S: TextSource> MovementPipeline<S> {
    pub fn new(config: PipelineConfig, source: S) -> Result<Self> {
        config.validate()?;
        let classifier = MovementClassifier::new(config.classification_tables()?);

        Ok(Self {
            config,
            source,
            classifier,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn classifier(&self) -> &MovementClassifier {
        &self.classifier
    }

    /// Discovers, extracts and reconciles every report in the configured folder.
    ///
    /// Fails only when the inventory report is missing, ambiguous or unreadable, or when
    /// there is no movement report at all. Unreadable movement reports are skipped.
    pub fn run(&self) -> Result<RunOutcome> {
        info!(
            "Processing reports in {}",
            self.config.reports_dir.display()
        );

        let files = discover_report_files(
            &self.config.reports_dir,
            &self.config.inventory_keyword,
            self.source.extension(),
        )?;

        let inventory = read_inventory(&self.source, &files.inventory)?;
        info!("Parsed {} inventory items", inventory.len());

        let extraction = extract_movements(&self.source, &files.movements, &self.classifier);
        info!(
            "Extracted {} movement lines from {} report(s), {} skipped",
            extraction.candidates.len(),
            files.movements.len() - extraction.skipped_files.len(),
            extraction.skipped_files.len()
        );

        if extraction.candidates.is_empty() {
            warn!("No movement line was extracted from any report");
        }

        let reconciliation =
            ReconciliationEngine::new(&self.classifier).reconcile(extraction.candidates, &inventory);

        Ok(RunOutcome {
            records: reconciliation.records,
            inventory,
            skipped_files: extraction.skipped_files,
            warnings: reconciliation.warnings,
            unmatched: reconciliation.unmatched,
        })
    }

    /// Runs and fully replaces the store with this run's records.
    pub fn overwrite<R: RecordStore + ?Sized>(&self, store: &R) -> Result<SyncSummary> {
        let outcome = self.run()?;
        let mut summary = SyncSummary::from_outcome(&outcome);

        if outcome.records.is_empty() {
            warn!("Nothing to write, the stored table is left unchanged");
            return Ok(summary);
        }

        store.replace(&outcome.records)?;
        self.write_inventory_snapshot(&outcome.inventory)?;

        summary.stored_after = outcome.records.len();
        summary.written = true;
        Ok(summary)
    }

    /// Runs, merges the new records into the stored table and rewrites it.
    pub fn sync<R: RecordStore + ?Sized>(&self, store: &R) -> Result<SyncSummary> {
        let existing = store.load()?;
        let stored_before = existing.len();
        debug!("{} records already stored", stored_before);

        let outcome = self.run()?;
        let mut summary = SyncSummary::from_outcome(&outcome);
        summary.stored_before = stored_before;
        summary.stored_after = stored_before;

        if outcome.records.is_empty() {
            warn!("No new records, the stored table is left unchanged");
            return Ok(summary);
        }

        let merged = merge_records(existing, outcome.records);
        store.replace(&merged.records)?;
        self.write_inventory_snapshot(&outcome.inventory)?;

        summary.stored_after = merged.records.len();
        summary.duplicates_removed = merged.duplicates_removed;
        summary.written = true;

        info!(
            "Store updated: {} -> {} records ({} new lines, {} duplicates removed)",
            summary.stored_before, summary.stored_after, summary.new_records, summary.duplicates_removed
        );

        Ok(summary)
    }

    /// Date range the report exports feeding the next `sync` should cover.
    pub fn extraction_window<R: RecordStore + ?Sized>(
        &self,
        store: &R,
        today: NaiveDate,
    ) -> Result<ExtractionWindow> {
        let existing = store.load()?;
        Ok(ExtractionWindow::next(&existing, today))
    }

    fn write_inventory_snapshot(&self, inventory: &[InventoryRecord]) -> Result<()> {
        match &self.config.inventory_store_path {
            Some(path) => write_inventory_csv(path, inventory),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;

    struct MemoryStore {
        records: RefCell<Vec<MovementRecord>>,
    }

    impl RecordStore for MemoryStore {
        fn load(&self) -> Result<Vec<MovementRecord>> {
            Ok(self.records.borrow().clone())
        }

        fn replace(&self, records: &[MovementRecord]) -> Result<()> {
            *self.records.borrow_mut() = records.to_vec();
            Ok(())
        }
    }

    /// Serves file contents by name, regardless of what is on disk.
    struct CannedSource {
        texts: HashMap<String, String>,
    }

    impl TextSource for CannedSource {
        fn extension(&self) -> &str {
            "pdf"
        }

        fn extract_text(&self, path: &Path) -> Result<String> {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.texts
                .get(&name)
                .cloned()
                .ok_or_else(|| MovementHistoryError::TextExtraction {
                    path: path.to_path_buf(),
                    details: "unreadable".to_string(),
                })
        }
    }

    const MOVEMENTS: &str = "123456 Nota ACME LTDA Cli-77 Carga:1-VENDA\n\
Cidade: CAMPINAS UF:SPData Emissão: 01/03/2024\n\
7654321-WIDGET KG 10,00 150,00 20,00 5101 Item: 1 15,00\n\
Total da Nota 150,00 0,00 150,00\n";

    const INVENTORY: &str = "Item Descrição UN Saldo Custo Unit. Custo Total\n1 WIDGET KG 100,000 8,00 800,00\n";

    fn setup() -> (tempfile::TempDir, MovementPipeline<CannedSource>) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ppReport1inventario.pdf"), "").unwrap();
        fs::write(dir.path().join("vendas.pdf"), "").unwrap();

        let mut texts = HashMap::new();
        texts.insert("ppReport1inventario.pdf".to_string(), INVENTORY.to_string());
        texts.insert("vendas.pdf".to_string(), MOVEMENTS.to_string());

        let mut config = PipelineConfig::new(dir.path(), dir.path().join("movimentacoes.csv"));
        let mut tables = ClassificationTables::default();
        tables.directions.insert("1-VENDA".to_string(), Direction::Outflow);
        tables.categories.insert("1-VENDA".to_string(), StatementCategory::Revenue);
        config.classification = Some(tables);

        let pipeline = MovementPipeline::new(config, CannedSource { texts }).unwrap();
        (dir, pipeline)
    }

    #[test]
    fn test_end_to_end_run() {
        let (_dir, pipeline) = setup();
        let outcome = pipeline.run().unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.inventory.len(), 1);
        assert!(outcome.skipped_files.is_empty());

        let record = &outcome.records[0];
        assert_eq!(record.note, "123456");
        assert_eq!(record.client, "ACME LTDA");
        assert_eq!(record.direction, Direction::Outflow);
        assert_eq!(record.category, StatementCategory::Revenue);
        assert_eq!(record.item_description, "WIDGET");
        assert_eq!(record.quantity, 15.0);
        assert_eq!(record.unit_cost, Some(8.0));
        assert_eq!(record.total_cost, 120.0);
        assert_eq!(record.issue_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(record.source_file, "vendas.pdf");

        assert_eq!(outcome.statement().net_revenue(), 150.0);
        assert_eq!(outcome.inventory_valuation().total_cost, 800.0);
    }

    #[test]
    fn test_sync_twice_is_idempotent() {
        let (_dir, pipeline) = setup();
        let store = MemoryStore {
            records: RefCell::new(Vec::new()),
        };

        let first = pipeline.sync(&store).unwrap();
        assert!(first.written);
        assert_eq!(first.stored_before, 0);
        assert_eq!(first.stored_after, 1);

        let second = pipeline.sync(&store).unwrap();
        assert_eq!(second.stored_before, 1);
        assert_eq!(second.stored_after, 1);
        assert_eq!(second.duplicates_removed, 1);
    }

    #[test]
    fn test_extraction_window_follows_store() {
        let (_dir, pipeline) = setup();
        let store = MemoryStore {
            records: RefCell::new(Vec::new()),
        };
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();

        let window = pipeline.extraction_window(&store, today).unwrap();
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        pipeline.sync(&store).unwrap();
        let window = pipeline.extraction_window(&store, today).unwrap();
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(window.end, today);
    }
}
