use crate::blocks::note_blocks;
use crate::schema::{LineItem, MovementCandidate, NoteHeader, NOT_AVAILABLE};
use log::debug;
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn note_client_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([\d-]+(?:-?NFSE)?)\s*Nota(.*?)\s*Cli-").expect("note/client regex")
    })
}

fn operation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Carga:([^\n]*)\n").expect("operation regex"))
}

fn tax_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(CPF|CNPJ):\s*([\d./-]+)").expect("tax id regex"))
}

fn city_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Cidade:\s*(.*?)\s*UF:\s*(\w{2})Data Emissão:\s*(\d{2}/\d{2}/\d{4})")
            .expect("city/date regex")
    })
}

fn document_total_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Total da Nota\s+[\d.,]+\s+[\d.,]+\s+([\d.,]+)").expect("document total regex")
    })
}

fn representative_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Repre\s*-\s*([^\n]*)\n").expect("representative regex"))
}

fn line_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(\d{7,}-.*?)\s+([A-Z]{2,4})\s+([\d.,]+)\s+([\d.,]+)\s+([\d.,]+)\s+(\d{4})\s+Item:\s+\d+\s+([\d.,]+)",
        )
        .expect("line item regex")
    })
}

fn leading_index_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\s*").expect("leading index regex"))
}

/// Printed artifact that sometimes follows "Repre -" instead of a name.
const REPRESENTATIVE_ARTIFACT: &str = "Unid.";

/// Payment method and, when printed, the installment due date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTerms {
    pub method: String,
    pub due_date: Option<String>,
}

/// The layouts a "Forma Pagto" section can take, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentPattern {
    /// Installment line carrying a due date, a document number, an index and the method.
    DatedInstallment,
    /// Note explicitly marked "Sem valor comercial".
    NoCommercialValue,
    /// Cash payment, "À vista".
    Cash,
    /// Card payment, "Cartão ...".
    Card,
}

impl PaymentPattern {
    pub const PRIORITY: [PaymentPattern; 4] = [
        PaymentPattern::DatedInstallment,
        PaymentPattern::NoCommercialValue,
        PaymentPattern::Cash,
        PaymentPattern::Card,
    ];

    fn regex(&self) -> &'static Regex {
        static DATED: OnceLock<Regex> = OnceLock::new();
        static NO_VALUE: OnceLock<Regex> = OnceLock::new();
        static CASH: OnceLock<Regex> = OnceLock::new();
        static CARD: OnceLock<Regex> = OnceLock::new();

        match self {
            PaymentPattern::DatedInstallment => DATED.get_or_init(|| {
                Regex::new(r"(?s)Forma Pagto.*?\n.*?\s(\d{2}/\d{2}/\d{4})\s+[\d-]+\s+\d+\s+([^\n]*)")
                    .expect("dated installment regex")
            }),
            PaymentPattern::NoCommercialValue => NO_VALUE.get_or_init(|| {
                Regex::new(r"(?s)Forma Pagto.*?\n[\d.,\s]+(\d+\s+Sem valor comercial)")
                    .expect("no commercial value regex")
            }),
            PaymentPattern::Cash => CASH.get_or_init(|| {
                Regex::new(r"(?s)Forma Pagto.*?\n.*?\s(\d+\s+À vista[^\n]*)").expect("cash regex")
            }),
            PaymentPattern::Card => CARD.get_or_init(|| {
                Regex::new(r"(?s)Forma Pagto.*?\n.*?\s(\d+\s+Cartão[^\n]*)").expect("card regex")
            }),
        }
    }

    pub fn extract(&self, block: &str) -> Option<PaymentTerms> {
        let caps = self.regex().captures(block)?;

        let terms = match self {
            PaymentPattern::DatedInstallment => PaymentTerms {
                method: clean_payment_method(capture(&caps, 2)?),
                due_date: Some(capture(&caps, 1)?.to_string()),
            },
            _ => PaymentTerms {
                method: clean_payment_method(capture(&caps, 1)?),
                due_date: None,
            },
        };

        Some(terms)
    }
}

fn capture<'t>(caps: &Captures<'t>, index: usize) -> Option<&'t str> {
    caps.get(index).map(|m| m.as_str().trim())
}

fn clean_payment_method(raw: &str) -> String {
    let mut method = raw;
    if let Some((head, _)) = method.split_once("Emissão:") {
        method = head;
    }
    if let Some((head, _)) = method.split_once("Entradas") {
        method = head;
    }

    leading_index_re()
        .replace(method.trim_start(), "")
        .trim()
        .to_string()
}

pub fn extract_payment_terms(block: &str) -> Option<PaymentTerms> {
    PaymentPattern::PRIORITY
        .iter()
        .find_map(|pattern| pattern.extract(block))
}

fn or_not_available(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

fn extract_representative(block: &str) -> String {
    let name = representative_re()
        .captures_iter(block)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim()))
        .find(|name| !name.starts_with(REPRESENTATIVE_ARTIFACT));

    or_not_available(name)
}

/// Reads every header field of a note block. Each field is independent: a field whose
/// label is missing is reported as "N/A" without affecting the others.
pub fn extract_header(block: &str) -> NoteHeader {
    let mut header = NoteHeader::default();

    if let Some(caps) = note_client_re().captures(block) {
        header.note = or_not_available(caps.get(1).map(|m| m.as_str()));
        header.client = or_not_available(caps.get(2).map(|m| m.as_str()));
    }

    header.operation_type =
        or_not_available(operation_re().captures(block).and_then(|c| capture(&c, 1)));
    header.tax_id = or_not_available(tax_id_re().captures(block).and_then(|c| capture(&c, 2)));
    header.representative = extract_representative(block);

    if let Some(caps) = city_date_re().captures(block) {
        header.city = or_not_available(capture(&caps, 1));
        header.state = or_not_available(capture(&caps, 2));
        header.issue_date = or_not_available(capture(&caps, 3));
    }

    header.document_total =
        or_not_available(document_total_re().captures(block).and_then(|c| capture(&c, 1)));

    if let Some(terms) = extract_payment_terms(block) {
        header.payment_method = or_not_available(Some(terms.method.as_str()));
        header.due_date = or_not_available(terms.due_date.as_deref());
    }

    header
}

pub fn extract_line_items(block: &str) -> Vec<LineItem> {
    line_item_re()
        .captures_iter(block)
        .map(|caps| LineItem {
            description: caps[1].trim().to_string(),
            unit: caps[2].to_string(),
            unit_price: caps[3].to_string(),
            line_total: caps[4].to_string(),
            sale_price: caps[5].to_string(),
            tax_operation_code: caps[6].to_string(),
            quantity: caps[7].to_string(),
        })
        .collect()
}

/// Turns one note block into movement candidates, one per item row.
/// A block without item rows (a totals-only note) yields nothing.
pub fn extract_block(block: &str, source_file: &str) -> Vec<MovementCandidate> {
    let items = extract_line_items(block);
    if items.is_empty() {
        return Vec::new();
    }

    let header = extract_header(block);
    items
        .into_iter()
        .map(|item| MovementCandidate {
            source_file: source_file.to_string(),
            header: header.clone(),
            item,
            direction: None,
        })
        .collect()
}

/// Extracts every movement candidate of one report, in block order then item order.
pub fn extract_document(text: &str, source_file: &str) -> Vec<MovementCandidate> {
    let mut candidates = Vec::new();
    let mut block_count = 0;
    let mut empty_blocks = 0;

    for block in note_blocks(text) {
        block_count += 1;
        let extracted = extract_block(block, source_file);
        if extracted.is_empty() {
            empty_blocks += 1;
        }
        candidates.extend(extracted);
    }

    debug!(
        "{}: {} note blocks, {} without items, {} movement lines",
        source_file,
        block_count,
        empty_blocks,
        candidates.len()
    );

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALE_BLOCK: &str = "000123456 Nota AGROPECUARIA BOA VISTA LTDA Cli-4521 Carga:1-VENDA DE MERCADORIAS - COOPERADO\n\
CNPJ: 12.345.678/0001-90 Repre - MARIA SOUZA\n\
Cidade: CAMPINAS UF:SPData Emissão: 01/03/2024\n\
1234567-RACAO BOVINA 40KG SC 95,50 955,00 99,00 5101 Item: 1 10,00\n\
7654321-SAL MINERAL KG 3,20 160,00 3,50 5102 Item: 2 50,00\n\
Total da Nota 1.115,00 0,00 1.115,00\n\
Forma Pagto Vencimento Valor\n\
1.115,00 15/03/2024 001-1 1 BOLETO BANCARIO Emissão: 01/03/2024\n";

    #[test]
    fn test_extract_header_fields() {
        let header = extract_header(SALE_BLOCK);

        assert_eq!(header.note, "000123456");
        assert_eq!(header.client, "AGROPECUARIA BOA VISTA LTDA");
        assert_eq!(header.operation_type, "1-VENDA DE MERCADORIAS - COOPERADO");
        assert_eq!(header.tax_id, "12.345.678/0001-90");
        assert_eq!(header.representative, "MARIA SOUZA");
        assert_eq!(header.city, "CAMPINAS");
        assert_eq!(header.state, "SP");
        assert_eq!(header.issue_date, "01/03/2024");
        assert_eq!(header.document_total, "1.115,00");
        assert_eq!(header.due_date, "15/03/2024");
        assert_eq!(header.payment_method, "BOLETO BANCARIO");
    }

    #[test]
    fn test_extract_line_items_in_order() {
        let items = extract_line_items(SALE_BLOCK);
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].description, "1234567-RACAO BOVINA 40KG");
        assert_eq!(items[0].unit, "SC");
        assert_eq!(items[0].unit_price, "95,50");
        assert_eq!(items[0].line_total, "955,00");
        assert_eq!(items[0].sale_price, "99,00");
        assert_eq!(items[0].tax_operation_code, "5101");
        assert_eq!(items[0].quantity, "10,00");

        assert_eq!(items[1].description, "7654321-SAL MINERAL");
        assert_eq!(items[1].unit, "KG");
        assert_eq!(items[1].quantity, "50,00");
    }

    #[test]
    fn test_items_share_block_header() {
        let candidates = extract_block(SALE_BLOCK, "vendas_marco.pdf");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].header, candidates[1].header);
        assert_eq!(candidates[0].source_file, "vendas_marco.pdf");
        assert!(candidates.iter().all(|c| c.direction.is_none()));
    }

    #[test]
    fn test_missing_headers_default_to_not_available() {
        let block = "42 Nota\n1234567-PARAFUSO SEXTAVADO UN 0,50 5,00 0,60 5102 Item: 1 10,00\n";
        let candidates = extract_block(block, "x.pdf");
        assert_eq!(candidates.len(), 1);

        let header = &candidates[0].header;
        assert_eq!(header.note, NOT_AVAILABLE);
        assert_eq!(header.client, NOT_AVAILABLE);
        assert_eq!(header.operation_type, NOT_AVAILABLE);
        assert_eq!(header.tax_id, NOT_AVAILABLE);
        assert_eq!(header.representative, NOT_AVAILABLE);
        assert_eq!(header.city, NOT_AVAILABLE);
        assert_eq!(header.issue_date, NOT_AVAILABLE);
        assert_eq!(header.document_total, NOT_AVAILABLE);
        assert_eq!(header.payment_method, NOT_AVAILABLE);
        assert_eq!(header.due_date, NOT_AVAILABLE);
    }

    #[test]
    fn test_block_without_items_yields_nothing() {
        let block = "99 Nota CLIENTE Cli-1 Carga:1-VENDA\nTotal da Nota 0,00 0,00 10,00\n";
        assert!(extract_block(block, "x.pdf").is_empty());
    }

    #[test]
    fn test_representative_artifact_is_excluded() {
        assert_eq!(extract_representative("Repre - Unid. 01\n"), NOT_AVAILABLE);
        assert_eq!(extract_representative("Repre - \n"), NOT_AVAILABLE);
        assert_eq!(
            extract_representative("Repre - Unid. 01\nRepre - CARLOS LIMA\n"),
            "CARLOS LIMA"
        );
    }

    #[test]
    fn test_payment_patterns() {
        let no_value = "Forma Pagto\n1.115,00 3 Sem valor comercial\n";
        assert_eq!(
            extract_payment_terms(no_value),
            Some(PaymentTerms {
                method: "Sem valor comercial".to_string(),
                due_date: None
            })
        );

        let cash = "Forma Pagto\n1.115,00 8 À vista Entradas 0,00\n";
        assert_eq!(
            extract_payment_terms(cash).map(|t| t.method),
            Some("À vista".to_string())
        );

        let card = "Forma Pagto\n1.115,00 5 Cartão de Crédito Visa\n";
        assert_eq!(
            extract_payment_terms(card).map(|t| t.method),
            Some("Cartão de Crédito Visa".to_string())
        );

        assert_eq!(extract_payment_terms("sem forma de pagamento"), None);
    }

    #[test]
    fn test_dated_installment_has_priority() {
        let terms = extract_payment_terms(SALE_BLOCK).unwrap();
        assert_eq!(terms.due_date.as_deref(), Some("15/03/2024"));
        assert_eq!(PaymentPattern::Cash.extract(SALE_BLOCK), None);
    }

    #[test]
    fn test_extract_document_skips_totals_only_notes() {
        let text = format!(
            "{}Total do Dia 1.115,00\n555 Nota CLIENTE X Cli-1\nTotal da Nota 0,00 0,00 0,00\n",
            SALE_BLOCK
        );
        let candidates = extract_document(&text, "vendas.pdf");
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.header.note == "000123456"));
    }
}
