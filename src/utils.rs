use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Date format printed by the ERP and used in the persisted table.
pub const BR_DATE_FORMAT: &str = "%d/%m/%Y";

/// Converts a number printed with `.` thousands and `,` decimal separators into `f64`.
///
/// Values without a comma are read as standard notation ("1234.56", "1.234"), so a
/// value that has already been normalized comes back unchanged. Anything unparseable
/// coerces to `0.0`.
pub fn parse_localized_decimal(raw: &str) -> f64 {
    let trimmed = raw.trim();

    let canonical = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };

    canonical
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Reads a number exactly as printed on a report. The ERP never prints standard
/// notation, so a comma-less dot-grouped integer ("1.000", "12.345.678") is thousands.
pub fn parse_report_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if is_dot_grouped_integer(trimmed) {
        return parse_localized_decimal(&trimmed.replace('.', ""));
    }
    parse_localized_decimal(trimmed)
}

fn is_dot_grouped_integer(value: &str) -> bool {
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    let mut groups = unsigned.split('.');

    let head_ok = groups
        .next()
        .map(|head| (1..=3).contains(&head.len()) && head.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false);

    let mut tail_count = 0;
    for group in groups {
        if group.len() != 3 || !group.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        tail_count += 1;
    }

    head_ok && tail_count > 0
}

pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes a leading `"<digits>-"` item code from a movement description.
pub fn strip_item_code_prefix(description: &str) -> &str {
    let trimmed = description.trim_start();
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return trimmed;
    }

    match trimmed[digits..].strip_prefix('-') {
        Some(rest) => rest,
        None => trimmed,
    }
}

/// Join key of the movement side: code prefix removed, whitespace collapsed.
pub fn normalize_movement_description(description: &str) -> String {
    collapse_whitespace(strip_item_code_prefix(description))
}

/// Join key of the inventory side: whitespace collapsed only.
pub fn normalize_inventory_description(description: &str) -> String {
    collapse_whitespace(description)
}

/// Parses a `dd/mm/YYYY` date as printed on the reports.
pub fn parse_report_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), BR_DATE_FORMAT).ok()
}

/// Parses a date read back from the persisted table, which may have been written by
/// different tools as `dd/mm/YYYY`, ISO `YYYY-MM-DD`, or either with a time part.
pub fn parse_persisted_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();

    for format in [BR_DATE_FORMAT, "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }

    for format in ["%d/%m/%Y %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(timestamp.date());
        }
    }

    None
}

pub fn format_br_date(date: NaiveDate) -> String {
    date.format(BR_DATE_FORMAT).to_string()
}

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// Serde adapter for `Option<NaiveDate>` columns stored as `dd/mm/YYYY`.
pub mod br_date {
    use super::{format_br_date, parse_persisted_date};
    use crate::schema::NOT_AVAILABLE;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&format_br_date(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(match raw.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) if value == NOT_AVAILABLE => None,
            Some(value) => parse_persisted_date(value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_localized_decimal() {
        assert_eq!(parse_localized_decimal("1.234,56"), 1234.56);
        assert_eq!(parse_localized_decimal("0,00"), 0.0);
        assert_eq!(parse_localized_decimal("15,00"), 15.0);
        assert_eq!(parse_localized_decimal("1.234.567,89"), 1234567.89);
        assert_eq!(parse_localized_decimal(" 8,5 "), 8.5);
        assert_eq!(parse_localized_decimal("-3,25"), -3.25);
    }

    #[test]
    fn test_malformed_numbers_coerce_to_zero() {
        assert_eq!(parse_localized_decimal("abc"), 0.0);
        assert_eq!(parse_localized_decimal(""), 0.0);
        assert_eq!(parse_localized_decimal("N/A"), 0.0);
        assert_eq!(parse_localized_decimal("NaN"), 0.0);
        assert_eq!(parse_localized_decimal("1,2,3"), 0.0);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let once = parse_localized_decimal("1234.56");
        assert_eq!(once, 1234.56);
        let twice = parse_localized_decimal(&once.to_string());
        assert_eq!(twice, once);

        let from_localized = parse_localized_decimal("1.234,56");
        assert_eq!(parse_localized_decimal(&from_localized.to_string()), 1234.56);

        for value in [1.234, 0.5, 12.345, 1000.0, 98765.432] {
            assert_eq!(parse_localized_decimal(&value.to_string()), value);
        }
    }

    #[test]
    fn test_report_numbers_read_dot_groups_as_thousands() {
        assert_eq!(parse_report_number("1.000"), 1000.0);
        assert_eq!(parse_report_number(" 12.345.678 "), 12345678.0);
        assert_eq!(parse_report_number("-1.000"), -1000.0);
        assert_eq!(parse_report_number("1.234,56"), 1234.56);
        assert_eq!(parse_report_number("1.5"), 1.5);
        assert_eq!(parse_report_number("1234.5678"), 1234.5678);
        assert_eq!(parse_report_number("N/A"), 0.0);

        assert_eq!(parse_localized_decimal("1.000"), 1.0);
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(10.005_1), 10.01);
        assert_eq!(round_money(150.0), 150.0);
        assert_eq!(round_money(0.1 + 0.2), 0.3);
    }

    #[test]
    fn test_description_normalization() {
        assert_eq!(normalize_movement_description("7654321-WIDGET"), "WIDGET");
        assert_eq!(
            normalize_movement_description("  0012-  RACAO   BOVINA 40KG "),
            "RACAO BOVINA 40KG"
        );
        assert_eq!(normalize_movement_description("ADUBO 10-10-10"), "ADUBO 10-10-10");
        assert_eq!(normalize_movement_description("123 PARAFUSO"), "123 PARAFUSO");
        assert_eq!(normalize_inventory_description("RACAO   BOVINA\t40KG "), "RACAO BOVINA 40KG");
        assert_eq!(normalize_inventory_description("0012-RACAO"), "0012-RACAO");
    }

    #[test]
    fn test_parse_dates() {
        let march_first = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(parse_report_date("01/03/2024"), Some(march_first));
        assert_eq!(parse_report_date("N/A"), None);

        assert_eq!(parse_persisted_date("01/03/2024"), Some(march_first));
        assert_eq!(parse_persisted_date("2024-03-01"), Some(march_first));
        assert_eq!(parse_persisted_date("2024-03-01 00:00:00"), Some(march_first));
        assert_eq!(parse_persisted_date("01/03/2024 00:00:00"), Some(march_first));
        assert_eq!(parse_persisted_date("março"), None);

        assert_eq!(format_br_date(march_first), "01/03/2024");
    }

    #[test]
    fn test_first_day_of_month() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            first_day_of_month(date),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
    }
}
