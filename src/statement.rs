use crate::schema::{Direction, MovementRecord, StatementCategory};
use crate::utils::round_money;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionTotals {
    pub inflow: f64,
    pub outflow: f64,
    pub no_movement: f64,
    pub unclassified: f64,
}

/// Simplified income statement (DRE) over reconciled movement lines. Every amount is
/// a sum of line totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub revenue: f64,
    pub deductions: f64,
    pub cost: f64,
    pub cost_reduction: f64,
    pub expenses: f64,
    pub neutral: f64,
    pub unclassified: f64,
    pub directions: DirectionTotals,
    /// Expense line totals per operation type.
    pub expenses_by_operation: BTreeMap<String, f64>,
    pub record_count: usize,
}

impl IncomeStatement {
    pub fn from_records(records: &[MovementRecord]) -> Self {
        let mut statement = Self {
            record_count: records.len(),
            ..Self::default()
        };

        for record in records {
            let amount = record.line_total;

            match record.category {
                StatementCategory::Revenue => statement.revenue += amount,
                StatementCategory::RevenueDeduction => statement.deductions += amount,
                StatementCategory::Cost => statement.cost += amount,
                StatementCategory::CostReduction => statement.cost_reduction += amount,
                StatementCategory::Expense => {
                    statement.expenses += amount;
                    *statement
                        .expenses_by_operation
                        .entry(record.operation_type.clone())
                        .or_insert(0.0) += amount;
                }
                StatementCategory::Neutral => statement.neutral += amount,
                StatementCategory::Unclassified => statement.unclassified += amount,
            }

            match record.direction {
                Direction::Inflow => statement.directions.inflow += amount,
                Direction::Outflow => statement.directions.outflow += amount,
                Direction::NoMovement => statement.directions.no_movement += amount,
                Direction::Unclassified => statement.directions.unclassified += amount,
            }
        }

        statement
    }

    pub fn net_revenue(&self) -> f64 {
        round_money(self.revenue - self.deductions)
    }

    pub fn net_cost(&self) -> f64 {
        round_money(self.cost - self.cost_reduction)
    }

    pub fn gross_result(&self) -> f64 {
        round_money(self.net_revenue() - self.net_cost())
    }

    pub fn net_result(&self) -> f64 {
        round_money(self.gross_result() - self.expenses)
    }

    /// The `n` operation types with the largest expense totals, largest first.
    pub fn top_expenses(&self, n: usize) -> Vec<(&str, f64)> {
        let mut expenses: Vec<(&str, f64)> = self
            .expenses_by_operation
            .iter()
            .map(|(operation, total)| (operation.as_str(), round_money(*total)))
            .collect();
        expenses.sort_by(|a, b| b.1.total_cmp(&a.1));
        expenses.truncate(n);
        expenses
    }

    fn lines(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("Receita Bruta", round_money(self.revenue)),
            ("(-) Deduções", round_money(self.deductions)),
            ("Receita Líquida", self.net_revenue()),
            ("(-) Custos", round_money(self.cost)),
            ("(+) Reduções de Custo", round_money(self.cost_reduction)),
            ("Resultado Bruto", self.gross_result()),
            ("(-) Despesas", round_money(self.expenses)),
            ("Resultado Líquido", self.net_result()),
        ]
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str("Section,Line,Amount\n");

        for (line, amount) in self.lines() {
            output.push_str(&format!("DRE,{},{:.2}\n", line, amount));
        }

        for (label, amount) in self.direction_lines() {
            output.push_str(&format!("Movimentação,{},{:.2}\n", label, amount));
        }

        output
    }

    fn direction_lines(&self) -> [(&'static str, f64); 4] {
        [
            (Direction::Inflow.label(), round_money(self.directions.inflow)),
            (Direction::Outflow.label(), round_money(self.directions.outflow)),
            (Direction::NoMovement.label(), round_money(self.directions.no_movement)),
            (Direction::Unclassified.label(), round_money(self.directions.unclassified)),
        ]
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# Demonstração do Resultado\n\n");
        output.push_str(&format!("**Linhas de movimentação:** {}\n\n", self.record_count));

        output.push_str("## DRE\n\n");
        output.push_str("| Linha | Valor |\n|---|---:|\n");
        for (line, amount) in self.lines() {
            output.push_str(&format!("| {} | {:.2} |\n", line, amount));
        }
        output.push('\n');

        output.push_str("## Movimentação\n\n");
        for (label, amount) in self.direction_lines() {
            output.push_str(&format!("- {}: {:.2}\n", label, amount));
        }
        output.push('\n');

        let top = self.top_expenses(5);
        if !top.is_empty() {
            output.push_str("## Maiores Despesas\n\n");
            for (operation, amount) in top {
                output.push_str(&format!("- {}: {:.2}\n", operation, amount));
            }
            output.push('\n');
        }

        if self.unclassified.abs() > f64::EPSILON {
            output.push_str(&format!(
                "**Não classificado:** {:.2}\n",
                round_money(self.unclassified)
            ));
        }

        output
    }
}
