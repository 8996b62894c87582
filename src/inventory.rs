use crate::schema::InventoryRecord;
use log::{debug, warn};

/// Tokens after the item code: description (at least one word), unit, balance,
/// unit cost and total cost.
const MIN_TOKENS_AFTER_CODE: usize = 5;

fn is_item_code(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

/// Parses one layout-preserved line of the inventory report.
///
/// Columns are read from the right: total cost, unit cost, balance and unit; the first
/// token is the item code and everything in between is the description. Header lines,
/// wrapped description lines and short lines yield `None`.
pub fn parse_inventory_line(line: &str) -> Option<InventoryRecord> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 5 || !is_item_code(tokens[0]) {
        return None;
    }

    if tokens.len() - 1 < MIN_TOKENS_AFTER_CODE {
        warn!("Inventory line skipped, unexpected layout: '{}'", line.trim());
        return None;
    }

    let n = tokens.len();
    Some(InventoryRecord {
        item_code: tokens[0].to_string(),
        description: tokens[1..n - 4].join(" "),
        unit: tokens[n - 4].to_string(),
        balance: tokens[n - 3].to_string(),
        unit_cost: tokens[n - 2].to_string(),
        total_cost: tokens[n - 1].to_string(),
    })
}

pub fn parse_inventory_page(page: &str) -> Vec<InventoryRecord> {
    page.lines().filter_map(parse_inventory_line).collect()
}

/// Parses every page of an inventory report, keeping page then line order.
pub fn parse_inventory_pages<S: AsRef<str>>(pages: &[S]) -> Vec<InventoryRecord> {
    let mut records = Vec::new();
    for (index, page) in pages.iter().enumerate() {
        let page_records = parse_inventory_page(page.as_ref());
        debug!("Inventory page {}: {} items", index + 1, page_records.len());
        records.extend(page_records);
    }
    records
}

/// Size and value of an inventory snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InventoryValuation {
    pub item_count: usize,
    pub total_cost: f64,
}

impl InventoryValuation {
    pub fn from_records(records: &[InventoryRecord]) -> Self {
        Self {
            item_count: records.len(),
            total_cost: records.iter().map(InventoryRecord::total_cost_value).sum(),
        }
    }
}
