use crate::classifier::MovementClassifier;
use crate::error::{MovementHistoryError, Result};
use crate::extractor::extract_document;
use crate::inventory::parse_inventory_pages;
use crate::schema::{InventoryRecord, MovementCandidate};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

const PAGE_BREAK: char = '\u{000C}';

/// Supplies report text. Movement reports are read as one blob per document; the
/// inventory report is read page by page with its column layout preserved.
pub trait TextSource {
    /// File extension (without dot) of the documents this source reads.
    fn extension(&self) -> &str;

    fn extract_text(&self, path: &Path) -> Result<String>;

    /// Per-page text. The default splits the full text on form feeds; text without
    /// form feeds comes back as a single page.
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>> {
        let text = self.extract_text(path)?;
        Ok(split_pages(&text))
    }
}

fn split_pages(text: &str) -> Vec<String> {
    text.split(PAGE_BREAK)
        .filter(|page| !page.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads text dumps of the reports (`.txt`, pages separated by form feeds).
#[derive(Debug, Clone, Default)]
pub struct PlainTextSource;

impl TextSource for PlainTextSource {
    fn extension(&self) -> &str {
        "txt"
    }

    fn extract_text(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| MovementHistoryError::TextExtraction {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
    }
}

/// Reads the PDF reports directly.
#[cfg(feature = "pdf")]
#[derive(Debug, Clone, Default)]
pub struct PdfTextSource;

#[cfg(feature = "pdf")]
impl TextSource for PdfTextSource {
    fn extension(&self) -> &str {
        "pdf"
    }

    fn extract_text(&self, path: &Path) -> Result<String> {
        pdf_extract::extract_text(path).map_err(|e| MovementHistoryError::TextExtraction {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
    }

    fn extract_pages(&self, path: &Path) -> Result<Vec<String>> {
        let bytes = fs::read(path).map_err(|e| MovementHistoryError::TextExtraction {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

        let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| {
            MovementHistoryError::TextExtraction {
                path: path.to_path_buf(),
                details: e.to_string(),
            }
        })?;

        Ok(pages
            .into_iter()
            .filter(|page| !page.trim().is_empty())
            .collect())
    }
}

/// The files of one run: the single inventory report and every movement report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFiles {
    pub inventory: PathBuf,
    pub movements: Vec<PathBuf>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Finds the inventory report (the only file whose name contains `keyword`) and the
/// movement reports (every other file with `extension`), sorted by path.
pub fn discover_report_files(dir: &Path, keyword: &str, extension: &str) -> Result<ReportFiles> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches_extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if path.is_file() && matches_extension {
            candidates.push(path);
        }
    }
    candidates.sort();

    let (inventory, movements): (Vec<PathBuf>, Vec<PathBuf>) = candidates
        .into_iter()
        .partition(|path| file_name(path).contains(keyword));

    if inventory.len() > 1 {
        return Err(MovementHistoryError::AmbiguousInventoryFile {
            keyword: keyword.to_string(),
            candidates: inventory,
        });
    }
    let inventory = inventory.into_iter().next().ok_or_else(|| {
        MovementHistoryError::InventoryFileNotFound {
            dir: dir.to_path_buf(),
            keyword: keyword.to_string(),
        }
    })?;

    if movements.is_empty() {
        return Err(MovementHistoryError::NoMovementFiles(dir.to_path_buf()));
    }

    info!(
        "Inventory report: '{}', {} movement report(s)",
        file_name(&inventory),
        movements.len()
    );

    Ok(ReportFiles {
        inventory,
        movements,
    })
}

#[derive(Debug, Clone, Default)]
pub struct MovementExtraction {
    pub candidates: Vec<MovementCandidate>,
    /// Files that could not be read or produced no movement line.
    pub skipped_files: Vec<PathBuf>,
}

/// Extracts and classifies movement lines from every report. A file that fails is
/// logged and listed in `skipped_files`; the remaining files are still processed.
pub fn extract_movements<S: TextSource + ?Sized>(
    source: &S,
    files: &[PathBuf],
    classifier: &MovementClassifier,
) -> MovementExtraction {
    let mut extraction = MovementExtraction::default();

    for path in files {
        let name = file_name(path);
        info!("Reading movement report '{}'", name);

        let text = match source.extract_text(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping '{}': {}", name, e);
                extraction.skipped_files.push(path.clone());
                continue;
            }
        };

        if text.trim().is_empty() {
            warn!("Skipping '{}': no text extracted", name);
            extraction.skipped_files.push(path.clone());
            continue;
        }

        let mut candidates = extract_document(&text, &name);
        if candidates.is_empty() {
            warn!("Skipping '{}': no movement lines matched", name);
            extraction.skipped_files.push(path.clone());
            continue;
        }

        for candidate in &mut candidates {
            candidate.direction = Some(classifier.direction(&candidate.header.operation_type));
        }

        debug!("'{}': {} movement lines", name, candidates.len());
        extraction.candidates.extend(candidates);
    }

    extraction
}

/// Reads and parses the inventory report. Failing to read it aborts the run.
pub fn read_inventory<S: TextSource + ?Sized>(source: &S, path: &Path) -> Result<Vec<InventoryRecord>> {
    info!("Reading inventory report '{}'", file_name(path));

    let pages = source
        .extract_pages(path)
        .map_err(|e| MovementHistoryError::InventoryExtraction {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

    let records = parse_inventory_pages(&pages);
    if records.is_empty() {
        warn!("Inventory report '{}' produced no items", file_name(path));
    }

    Ok(records)
}
