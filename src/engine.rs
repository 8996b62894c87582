use crate::classifier::MovementClassifier;
use crate::schema::{InventoryRecord, MovementCandidate, MovementRecord};
use crate::utils::{
    normalize_inventory_description, normalize_movement_description, parse_report_number,
    parse_report_date, round_money,
};
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Data-quality findings that do not stop a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationWarning {
    /// More than one inventory row carries the same normalized description, so no unit
    /// cost was joined for movements of that description.
    AmbiguousCostMatch {
        description: String,
        item_codes: Vec<String>,
    },
}

impl fmt::Display for ReconciliationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconciliationWarning::AmbiguousCostMatch {
                description,
                item_codes,
            } => write!(
                f,
                "Description '{}' matches {} inventory items ({}); unit cost left empty",
                description,
                item_codes.len(),
                item_codes.join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub records: Vec<MovementRecord>,
    pub warnings: Vec<ReconciliationWarning>,
    /// Movement lines whose description matched no inventory row.
    pub unmatched: usize,
}

enum CostLookup<'a> {
    Unique(&'a InventoryRecord),
    Ambiguous(&'a [&'a InventoryRecord]),
    Missing,
}

struct CostIndex<'a> {
    by_description: HashMap<String, Vec<&'a InventoryRecord>>,
}

impl<'a> CostIndex<'a> {
    fn build(inventory: &'a [InventoryRecord]) -> Self {
        let mut by_description: HashMap<String, Vec<&'a InventoryRecord>> = HashMap::new();
        for row in inventory {
            by_description
                .entry(normalize_inventory_description(&row.description))
                .or_default()
                .push(row);
        }
        Self { by_description }
    }

    fn lookup(&self, description: &str) -> CostLookup<'_> {
        match self.by_description.get(description).map(Vec::as_slice) {
            Some([row]) => CostLookup::Unique(*row),
            Some(rows) if rows.len() > 1 => CostLookup::Ambiguous(rows),
            _ => CostLookup::Missing,
        }
    }
}

pub struct ReconciliationEngine<'a> {
    classifier: &'a MovementClassifier,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(classifier: &'a MovementClassifier) -> Self {
        Self { classifier }
    }

    /// Left-joins movement lines to inventory unit costs by normalized description,
    /// converts localized numbers, derives total cost and attaches the classification.
    /// Output order is input order.
    pub fn reconcile(
        &self,
        candidates: Vec<MovementCandidate>,
        inventory: &[InventoryRecord],
    ) -> Reconciliation {
        let index = CostIndex::build(inventory);
        let mut reconciliation = Reconciliation::default();
        let mut reported: HashSet<String> = HashSet::new();

        for candidate in candidates {
            let description = normalize_movement_description(&candidate.item.description);

            let unit_cost = match index.lookup(&description) {
                CostLookup::Unique(row) => Some(row.unit_cost_value()),
                CostLookup::Ambiguous(rows) => {
                    if reported.insert(description.clone()) {
                        let warning = ReconciliationWarning::AmbiguousCostMatch {
                            description: description.clone(),
                            item_codes: rows.iter().map(|r| r.item_code.clone()).collect(),
                        };
                        warn!("{}", warning);
                        reconciliation.warnings.push(warning);
                    }
                    None
                }
                CostLookup::Missing => {
                    reconciliation.unmatched += 1;
                    None
                }
            };

            reconciliation
                .records
                .push(self.build_record(candidate, description, unit_cost));
        }

        info!(
            "Reconciled {} movement lines ({} without inventory cost, {} ambiguous descriptions)",
            reconciliation.records.len(),
            reconciliation.unmatched,
            reconciliation.warnings.len()
        );

        reconciliation
    }

    fn build_record(
        &self,
        candidate: MovementCandidate,
        item_description: String,
        unit_cost: Option<f64>,
    ) -> MovementRecord {
        let MovementCandidate {
            source_file,
            header,
            item,
            direction,
        } = candidate;

        let quantity = parse_report_number(&item.quantity);
        let direction = direction.unwrap_or_else(|| self.classifier.direction(&header.operation_type));
        let category = self.classifier.category(&header.operation_type);

        MovementRecord {
            direction,
            note: header.note,
            issue_date: parse_report_date(&header.issue_date),
            operation_type: header.operation_type,
            category,
            client: header.client,
            tax_id: header.tax_id,
            representative: header.representative,
            city: header.city,
            state: header.state,
            item_description,
            unit: item.unit,
            quantity,
            unit_price: parse_report_number(&item.unit_price),
            line_total: round_money(parse_report_number(&item.line_total)),
            sale_price: parse_report_number(&item.sale_price),
            unit_cost,
            total_cost: round_money(unit_cost.unwrap_or(0.0) * quantity),
            tax_operation_code: item.tax_operation_code,
            document_total: round_money(parse_report_number(&header.document_total)),
            due_date: parse_report_date(&header.due_date),
            payment_method: header.payment_method,
            source_file,
        }
    }
}
