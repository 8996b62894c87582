use crate::schema::MovementRecord;
use crate::utils::first_day_of_month;
use chrono::NaiveDate;
use log::info;
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub records: Vec<MovementRecord>,
    pub duplicates_removed: usize,
}

/// Unions previously persisted records with a new extraction batch.
///
/// Records sharing a natural key collapse to the one appearing last in
/// `existing ++ new`, so a re-extracted note replaces its stored version. The result is
/// sorted by issue date (stable, undated records last).
pub fn merge_records(existing: Vec<MovementRecord>, new: Vec<MovementRecord>) -> MergeOutcome {
    let total = existing.len() + new.len();
    let mut seen = HashSet::with_capacity(total);

    let mut records: Vec<MovementRecord> = existing
        .into_iter()
        .chain(new)
        .rev()
        .filter(|record| seen.insert(record.natural_key()))
        .collect();
    records.reverse();
    records.sort_by(|a, b| compare_issue_dates(a.issue_date, b.issue_date));

    let duplicates_removed = total - records.len();
    info!(
        "Merged {} records into {} ({} duplicates removed)",
        total,
        records.len(),
        duplicates_removed
    );

    MergeOutcome {
        records,
        duplicates_removed,
    }
}

fn compare_issue_dates(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Date range the next incremental extraction should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ExtractionWindow {
    /// Starts at the latest persisted issue date (re-reading that day, since it may have
    /// been incomplete), or at the first day of the current month when nothing dated is
    /// stored yet.
    pub fn next(existing: &[MovementRecord], today: NaiveDate) -> Self {
        let start = existing
            .iter()
            .filter_map(|record| record.issue_date)
            .max()
            .unwrap_or_else(|| first_day_of_month(today));

        Self { start, end: today }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Direction, StatementCategory};

    fn record(note: &str, date: Option<(i32, u32, u32)>, line_total: f64, client: &str) -> MovementRecord {
        MovementRecord {
            direction: Direction::Outflow,
            note: note.to_string(),
            issue_date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            operation_type: "1-VENDA".to_string(),
            category: StatementCategory::Revenue,
            client: client.to_string(),
            tax_id: "N/A".to_string(),
            representative: "N/A".to_string(),
            city: "N/A".to_string(),
            state: "N/A".to_string(),
            item_description: "WIDGET".to_string(),
            unit: "KG".to_string(),
            quantity: 1.0,
            unit_price: line_total,
            line_total,
            sale_price: line_total,
            unit_cost: None,
            total_cost: 0.0,
            tax_operation_code: "5101".to_string(),
            document_total: line_total,
            due_date: None,
            payment_method: "N/A".to_string(),
            source_file: "a.pdf".to_string(),
        }
    }

    #[test]
    fn test_duplicate_keeps_new_record() {
        let existing = vec![record("1", Some((2024, 3, 1)), 10.0, "V1")];
        let new = vec![record("1", Some((2024, 3, 1)), 10.0, "V2")];

        let outcome = merge_records(existing, new);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].client, "V2");
        assert_eq!(outcome.duplicates_removed, 1);
    }

    #[test]
    fn test_distinct_keys_are_kept_and_sorted() {
        let existing = vec![
            record("3", Some((2024, 3, 5)), 10.0, "A"),
            record("1", Some((2024, 3, 1)), 10.0, "B"),
        ];
        let new = vec![
            record("2", Some((2024, 3, 2)), 10.0, "C"),
            record("9", None, 10.0, "D"),
            record("1", Some((2024, 3, 1)), 11.0, "E"),
        ];

        let outcome = merge_records(existing, new);
        let notes: Vec<&str> = outcome.records.iter().map(|r| r.note.as_str()).collect();
        assert_eq!(notes, vec!["1", "1", "2", "3", "9"]);
        assert_eq!(outcome.records[0].client, "B");
        assert_eq!(outcome.records[1].client, "E");
        assert_eq!(outcome.duplicates_removed, 0);
    }

    #[test]
    fn test_duplicates_within_new_batch_keep_last() {
        let new = vec![
            record("1", Some((2024, 3, 1)), 10.0, "first"),
            record("1", Some((2024, 3, 1)), 10.0, "second"),
        ];
        let outcome = merge_records(Vec::new(), new);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].client, "second");
    }

    #[test]
    fn test_extraction_window() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();

        let empty = ExtractionWindow::next(&[], today);
        assert_eq!(empty.start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(empty.end, today);

        let stored = vec![
            record("1", Some((2024, 2, 10)), 1.0, "A"),
            record("2", Some((2024, 3, 12)), 1.0, "B"),
            record("3", None, 1.0, "C"),
        ];
        let window = ExtractionWindow::next(&stored, today);
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
    }
}
