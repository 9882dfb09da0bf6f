//! Row normalizer - mapped table rows to reviewable transactions

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::domain::result::Result;
use crate::domain::{ColumnMapping, NormalizedTransaction, RawTable, TransactionKind};

/// Output of [`normalize_rows`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeOutcome {
    pub transactions: Vec<NormalizedTransaction>,
    /// Rows left out for a zero value or a blank description
    pub dropped: usize,
}

/// Parse a Brazilian-formatted amount, `None` when it is not a number
///
/// `R$` tokens and whitespace are removed, `.` is a thousands separator and
/// the first `,` is the decimal mark. An empty cell reads as zero.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let raw = if raw.trim().is_empty() { "0" } else { raw };

    let cleaned: String = raw
        .replace("R$", "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect();
    let cleaned = cleaned.replacen(',', ".", 1);

    Decimal::from_str(&cleaned).ok()
}

/// Like [`parse_amount`] but anything unparseable becomes zero
pub fn normalize_value(raw: &str) -> Decimal {
    parse_amount(raw).unwrap_or(Decimal::ZERO)
}

/// Apply a column mapping to every row of `table`
///
/// The mapping is validated before any row is read. Rows with a zero value
/// or a blank description are dropped silently; the rest keep their order
/// and are numbered from 0.
pub fn normalize_rows(table: &RawTable, mapping: &ColumnMapping) -> Result<NormalizeOutcome> {
    let columns = mapping.resolve(table.width())?;

    let mut outcome = NormalizeOutcome::default();
    for row in table.rows() {
        let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");

        let value = normalize_value(cell(columns.value));
        let description = cell(columns.description).trim();
        if value.is_zero() || description.is_empty() {
            outcome.dropped += 1;
            continue;
        }

        outcome.transactions.push(NormalizedTransaction {
            id: outcome.transactions.len(),
            date: cell(columns.date).to_string(),
            description: description.to_string(),
            value,
            kind: TransactionKind::from_value(value),
            selected: true,
        });
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::{Error, MappingError};
    use crate::domain::ColumnRole;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn table(rows: &[[&str; 3]]) -> RawTable {
        let mut table = RawTable::new(vec!["Data".into(), "Descrição".into(), "Valor".into()]);
        for row in rows {
            table.push_row(row.iter().map(|s| s.to_string()).collect());
        }
        table
    }

    #[test]
    fn test_normalize_value_brazilian_formats() {
        assert_eq!(normalize_value("R$ 1.234,56"), dec("1234.56"));
        assert_eq!(normalize_value("-R$ 50,00"), dec("-50.00"));
        assert_eq!(normalize_value("1.000.000,00"), dec("1000000.00"));
        assert_eq!(normalize_value("R$\u{a0}10,00"), dec("10.00"));
        assert_eq!(normalize_value("42"), dec("42"));
    }

    #[test]
    fn test_normalize_value_falls_back_to_zero() {
        assert_eq!(normalize_value(""), Decimal::ZERO);
        assert_eq!(normalize_value("   "), Decimal::ZERO);
        assert_eq!(normalize_value("abc"), Decimal::ZERO);
        assert_eq!(normalize_value("1,2,3"), Decimal::ZERO);
    }

    #[test]
    fn test_parse_amount_is_strict() {
        assert_eq!(parse_amount("Mercado"), None);
        assert_eq!(parse_amount("12abc"), None);
        assert_eq!(parse_amount("-12,00"), Some(dec("-12.00")));
    }

    #[test]
    fn test_blank_description_is_dropped() {
        let outcome = normalize_rows(
            &table(&[["01/05/2024", "", "-10,00"], ["01/05/2024", "Mercado", "-10,00"]]),
            &ColumnMapping::new(0, 1, 2),
        )
        .unwrap();

        assert_eq!(outcome.dropped, 1);
        assert_eq!(outcome.transactions.len(), 1);
        let tx = &outcome.transactions[0];
        assert_eq!(tx.description, "Mercado");
        assert_eq!(tx.value, dec("-10.00"));
        assert_eq!(tx.kind, TransactionKind::Expense);
        assert!(tx.selected);
    }

    #[test]
    fn test_zero_values_dropped_near_zero_kept() {
        let outcome = normalize_rows(
            &table(&[
                ["01/05/2024", "Zero", "0,00"],
                ["01/05/2024", "Empty", ""],
                ["01/05/2024", "Garbage", "n/a"],
                ["01/05/2024", "Tiny", "0,001"],
                ["01/05/2024", "Tiny fee", "-0,001"],
            ]),
            &ColumnMapping::new(0, 1, 2),
        )
        .unwrap();

        assert_eq!(outcome.dropped, 3);
        assert_eq!(outcome.transactions.len(), 2);
        assert_eq!(outcome.transactions[0].value, dec("0.001"));
        assert_eq!(outcome.transactions[0].kind, TransactionKind::Income);
        assert_eq!(outcome.transactions[1].value, dec("-0.001"));
        assert_eq!(outcome.transactions[1].kind, TransactionKind::Expense);
        assert_eq!(outcome.transactions[1].id, 1);
    }

    #[test]
    fn test_ids_are_contiguous_after_filtering() {
        let outcome = normalize_rows(
            &table(&[
                ["01/05/2024", "A", "1,00"],
                ["02/05/2024", "B", "0"],
                ["03/05/2024", "C", "-3,00"],
                ["04/05/2024", " ", "4,00"],
                ["05/05/2024", "E", "5,00"],
            ]),
            &ColumnMapping::new(0, 1, 2),
        )
        .unwrap();

        let ids: Vec<usize> = outcome.transactions.iter().map(|t| t.id).collect();
        let names: Vec<&str> = outcome.transactions.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(names, vec!["A", "C", "E"]);
    }

    #[test]
    fn test_date_passes_through_verbatim() {
        let outcome = normalize_rows(
            &table(&[["2024-05-01 08:30", "Café", "-7,50"]]),
            &ColumnMapping::new(0, 1, 2),
        )
        .unwrap();
        assert_eq!(outcome.transactions[0].date, "2024-05-01 08:30");
    }

    #[test]
    fn test_incomplete_mapping_rejected_before_rows() {
        let mapping = ColumnMapping {
            date: Some(0),
            description: Some(1),
            value: None,
        };
        match normalize_rows(&table(&[["01/05/2024", "A", "1,00"]]), &mapping) {
            Err(Error::Mapping(MappingError::IncompleteMapping { role, index, .. })) => {
                assert_eq!(role, ColumnRole::Value);
                assert_eq!(index, None);
            }
            other => panic!("expected mapping error, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_mapping_rejected() {
        let result = normalize_rows(&table(&[]), &ColumnMapping::new(0, 1, 7));
        assert!(matches!(
            result,
            Err(Error::Mapping(MappingError::IncompleteMapping { index: Some(7), width: 3, .. }))
        ));
    }
}
