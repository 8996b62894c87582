use crate::utils::{br_date, parse_report_number};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder used for any header field the report did not carry.
pub const NOT_AVAILABLE: &str = "N/A";

/// Persisted column order of the reconciled movement table.
pub const OUTPUT_COLUMNS: [&str; 23] = [
    "Movimentação",
    "Nota",
    "Data Emissão",
    "Tipo de Operação",
    "Classificação DRE",
    "Cliente",
    "CPF/CNPJ",
    "Representante",
    "Cidade",
    "UF",
    "Item Descrição",
    "Unidade",
    "Quantidade",
    "Valor Unitário",
    "Total do Item",
    "Preço de Venda",
    "Preço de Custo",
    "Custo Total",
    "CFOP",
    "Total da Nota",
    "Data de Vencimento",
    "Forma de Pagto",
    "Arquivo Origem",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
pub enum Direction {
    #[serde(rename = "Entrada")]
    #[schemars(description = "Goods entering stock (purchases, returns from customers, inbound transfers)")]
    Inflow,

    #[serde(rename = "Saída")]
    #[schemars(description = "Goods leaving stock (sales, returns to suppliers, outbound transfers)")]
    Outflow,

    #[serde(rename = "Sem Movimentação")]
    #[schemars(description = "Fiscal document with no physical stock effect (future delivery sales, lot adjustments, services)")]
    NoMovement,

    #[serde(rename = "Outros")]
    #[schemars(description = "Operation code absent from the direction table")]
    Unclassified,
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Inflow => "Entrada",
            Direction::Outflow => "Saída",
            Direction::NoMovement => "Sem Movimentação",
            Direction::Unclassified => "Outros",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
pub enum StatementCategory {
    #[serde(rename = "Receita")]
    #[schemars(description = "Gross operating revenue (sales, deliveries of future-delivery sales)")]
    Revenue,

    #[serde(rename = "Dedução de Receita")]
    #[schemars(description = "Reductions of gross revenue (customer returns)")]
    RevenueDeduction,

    #[serde(rename = "Custo")]
    #[schemars(description = "Cost of goods acquired for resale")]
    Cost,

    #[serde(rename = "Redução de Custo")]
    #[schemars(description = "Reductions of cost (returns to suppliers)")]
    CostReduction,

    #[serde(rename = "Despesa")]
    #[schemars(description = "Operating expenses (consumables, fuel, services, bonuses)")]
    Expense,

    #[serde(rename = "Neutro")]
    #[schemars(description = "No effect on the income statement (transfers, consignment, adjustments)")]
    Neutral,

    #[serde(rename = "Não Classificado")]
    #[schemars(description = "Operation code absent from the category table")]
    Unclassified,
}

impl StatementCategory {
    pub fn label(&self) -> &'static str {
        match self {
            StatementCategory::Revenue => "Receita",
            StatementCategory::RevenueDeduction => "Dedução de Receita",
            StatementCategory::Cost => "Custo",
            StatementCategory::CostReduction => "Redução de Custo",
            StatementCategory::Expense => "Despesa",
            StatementCategory::Neutral => "Neutro",
            StatementCategory::Unclassified => "Não Classificado",
        }
    }
}

impl fmt::Display for StatementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Header fields shared by every line item of one fiscal note, exactly as printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteHeader {
    pub note: String,
    pub client: String,
    pub operation_type: String,
    pub tax_id: String,
    pub representative: String,
    pub city: String,
    pub state: String,
    pub issue_date: String,
    pub document_total: String,
    pub due_date: String,
    pub payment_method: String,
}

impl Default for NoteHeader {
    fn default() -> Self {
        Self {
            note: NOT_AVAILABLE.to_string(),
            client: NOT_AVAILABLE.to_string(),
            operation_type: NOT_AVAILABLE.to_string(),
            tax_id: NOT_AVAILABLE.to_string(),
            representative: NOT_AVAILABLE.to_string(),
            city: NOT_AVAILABLE.to_string(),
            state: NOT_AVAILABLE.to_string(),
            issue_date: NOT_AVAILABLE.to_string(),
            document_total: NOT_AVAILABLE.to_string(),
            due_date: NOT_AVAILABLE.to_string(),
            payment_method: NOT_AVAILABLE.to_string(),
        }
    }
}

/// One item row of a note. Numbers keep their localized spelling ("1.234,56").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub description: String,
    pub unit: String,
    pub unit_price: String,
    pub line_total: String,
    pub sale_price: String,
    pub tax_operation_code: String,
    pub quantity: String,
}

/// A parsed but not yet reconciled movement line.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementCandidate {
    pub source_file: String,
    pub header: NoteHeader,
    pub item: LineItem,
    pub direction: Option<Direction>,
}

/// Deduplication key of a movement line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub note: String,
    pub issue_date: Option<NaiveDate>,
    pub item_description: String,
    pub quantity_milli: i64,
    pub line_total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MovementRecord {
    #[serde(rename = "Movimentação")]
    pub direction: Direction,

    #[serde(rename = "Nota")]
    pub note: String,

    #[serde(rename = "Data Emissão", with = "br_date")]
    #[schemars(with = "Option<String>", description = "Issue date, dd/mm/YYYY")]
    pub issue_date: Option<NaiveDate>,

    #[serde(rename = "Tipo de Operação")]
    #[schemars(description = "Operation type as printed by the ERP, '<code>-<description>'")]
    pub operation_type: String,

    #[serde(rename = "Classificação DRE")]
    pub category: StatementCategory,

    #[serde(rename = "Cliente")]
    pub client: String,

    #[serde(rename = "CPF/CNPJ")]
    pub tax_id: String,

    #[serde(rename = "Representante")]
    pub representative: String,

    #[serde(rename = "Cidade")]
    pub city: String,

    #[serde(rename = "UF")]
    pub state: String,

    #[serde(rename = "Item Descrição")]
    #[schemars(description = "Item description without the item-code prefix, whitespace collapsed")]
    pub item_description: String,

    #[serde(rename = "Unidade")]
    pub unit: String,

    #[serde(rename = "Quantidade")]
    pub quantity: f64,

    #[serde(rename = "Valor Unitário")]
    pub unit_price: f64,

    #[serde(rename = "Total do Item")]
    pub line_total: f64,

    #[serde(rename = "Preço de Venda")]
    pub sale_price: f64,

    #[serde(rename = "Preço de Custo")]
    #[schemars(description = "Unit cost joined from the inventory report; empty when no single inventory row matched")]
    pub unit_cost: Option<f64>,

    #[serde(rename = "Custo Total")]
    pub total_cost: f64,

    #[serde(rename = "CFOP")]
    pub tax_operation_code: String,

    #[serde(rename = "Total da Nota")]
    pub document_total: f64,

    #[serde(rename = "Data de Vencimento", with = "br_date")]
    #[schemars(with = "Option<String>", description = "Due date, dd/mm/YYYY")]
    pub due_date: Option<NaiveDate>,

    #[serde(rename = "Forma de Pagto")]
    pub payment_method: String,

    #[serde(rename = "Arquivo Origem")]
    pub source_file: String,
}

impl MovementRecord {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            note: self.note.clone(),
            issue_date: self.issue_date,
            item_description: self.item_description.clone(),
            quantity_milli: (self.quantity * 1000.0).round() as i64,
            line_total_cents: (self.line_total * 100.0).round() as i64,
        }
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(MovementRecord)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

/// One row of the inventory report. Quantities and costs are kept as printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InventoryRecord {
    #[serde(rename = "Item")]
    pub item_code: String,

    #[serde(rename = "Descrição")]
    pub description: String,

    #[serde(rename = "UN")]
    pub unit: String,

    #[serde(rename = "Saldo")]
    pub balance: String,

    #[serde(rename = "Custo Unit.")]
    pub unit_cost: String,

    #[serde(rename = "Custo Total")]
    pub total_cost: String,
}

impl InventoryRecord {
    pub fn balance_value(&self) -> f64 {
        parse_report_number(&self.balance)
    }

    pub fn unit_cost_value(&self) -> f64 {
        parse_report_number(&self.unit_cost)
    }

    pub fn total_cost_value(&self) -> f64 {
        parse_report_number(&self.total_cost)
    }
}
