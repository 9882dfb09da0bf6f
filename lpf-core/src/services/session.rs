//! Upload and review state between parsing and submission

use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{
    ColumnMapping, ImportRequest, ImportTransaction, NormalizedTransaction, ParsedCsv, RawTable,
    TransactionKind,
};
use crate::services::normalizer::normalize_rows;
use crate::services::parser;

/// A parsed statement waiting for its column mapping
#[derive(Debug, Clone)]
pub struct UploadedStatement {
    table: RawTable,
    preview: ParsedCsv,
}

impl UploadedStatement {
    pub fn parse(text: &str, preview_rows: usize) -> Result<Self> {
        let table = parser::parse(text)?;
        let preview = parser::summarize(&table, preview_rows);
        Ok(Self { table, preview })
    }

    /// Upload response: headers, sample rows, row count and guessed columns
    pub fn preview(&self) -> &ParsedCsv {
        &self.preview
    }

    pub fn table(&self) -> &RawTable {
        &self.table
    }

    pub fn detected_columns(&self) -> ColumnMapping {
        self.preview.detected_columns
    }

    /// Normalize every row with `mapping`; unset roles fall back to detection
    pub fn confirm_mapping(&self, mapping: ColumnMapping) -> Result<ReviewSession> {
        let mapping = mapping.or(self.detected_columns());
        let outcome = normalize_rows(&self.table, &mapping)?;
        Ok(ReviewSession {
            mapping,
            transactions: outcome.transactions,
            dropped: outcome.dropped,
        })
    }
}

/// Selection and retyping of normalized rows before submission
#[derive(Debug, Clone)]
pub struct ReviewSession {
    mapping: ColumnMapping,
    transactions: Vec<NormalizedTransaction>,
    dropped: usize,
}

impl ReviewSession {
    pub fn new(transactions: Vec<NormalizedTransaction>) -> Self {
        Self {
            mapping: ColumnMapping::default(),
            transactions,
            dropped: 0,
        }
    }

    pub fn mapping(&self) -> ColumnMapping {
        self.mapping
    }

    pub fn transactions(&self) -> &[NormalizedTransaction] {
        &self.transactions
    }

    /// Rows excluded during normalization
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn get_mut(&mut self, id: usize) -> Result<&mut NormalizedTransaction> {
        self.transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::not_found(format!("transaction {}", id)))
    }

    /// Flip selection of one row, returning the new state
    pub fn toggle(&mut self, id: usize) -> Result<bool> {
        let tx = self.get_mut(id)?;
        tx.selected = !tx.selected;
        Ok(tx.selected)
    }

    pub fn select_all(&mut self, selected: bool) {
        for tx in &mut self.transactions {
            tx.selected = selected;
        }
    }

    /// Select everything, or clear the selection when everything is selected
    pub fn toggle_all(&mut self) {
        let all = self.transactions.iter().all(|t| t.selected);
        self.select_all(!all);
    }

    pub fn set_kind(&mut self, id: usize, kind: TransactionKind) -> Result<()> {
        self.get_mut(id)?.kind = kind;
        Ok(())
    }

    pub fn selected_count(&self) -> usize {
        self.transactions.iter().filter(|t| t.selected).count()
    }

    /// (incomes, expenses) of the selected rows, by magnitude and current kind
    pub fn selected_totals(&self) -> (Decimal, Decimal) {
        self.transactions
            .iter()
            .filter(|t| t.selected)
            .fold((Decimal::ZERO, Decimal::ZERO), |(incomes, expenses), t| match t.kind {
                TransactionKind::Income => (incomes + t.value.abs(), expenses),
                TransactionKind::Expense => (incomes, expenses + t.value.abs()),
            })
    }

    /// Build the submission request from the selected rows
    pub fn into_request(self, default_category_id: Option<String>) -> Result<ImportRequest> {
        let transactions: Vec<ImportTransaction> = self
            .transactions
            .iter()
            .filter(|t| t.selected)
            .map(ImportTransaction::from)
            .collect();

        if transactions.is_empty() {
            return Err(Error::validation("select at least one transaction"));
        }

        Ok(ImportRequest {
            transactions,
            default_category_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATEMENT: &str = "Data;Descrição;Valor\n\
                             01/05/2024;Mercado;-150,50\n\
                             02/05/2024;Salário;5.000,00\n\
                             03/05/2024;Estorno;0,00\n\
                             04/05/2024;Farmácia;-30,00\n";

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn review() -> ReviewSession {
        UploadedStatement::parse(STATEMENT, 10)
            .unwrap()
            .confirm_mapping(ColumnMapping::default())
            .unwrap()
    }

    #[test]
    fn test_upload_preview() {
        let upload = UploadedStatement::parse(STATEMENT, 2).unwrap();
        let preview = upload.preview();
        assert_eq!(preview.total_rows, 4);
        assert_eq!(preview.sample_data.len(), 2);
        assert_eq!(preview.detected_columns, ColumnMapping::new(0, 1, 2));
    }

    #[test]
    fn test_explicit_mapping_wins_over_detection() {
        let upload = UploadedStatement::parse(STATEMENT, 10).unwrap();
        let explicit = ColumnMapping {
            date: None,
            description: Some(0),
            value: None,
        };
        let session = upload.confirm_mapping(explicit).unwrap();
        assert_eq!(session.mapping(), ColumnMapping::new(0, 0, 2));
        assert_eq!(session.transactions()[0].description, "01/05/2024");
    }

    #[test]
    fn test_review_counts_and_totals() {
        let session = review();
        assert_eq!(session.dropped(), 1);
        assert_eq!(session.selected_count(), 3);
        assert_eq!(session.selected_totals(), (dec("5000.00"), dec("180.50")));
    }

    #[test]
    fn test_totals_follow_retyped_kind() {
        let text = "Data;Descrição;Valor\n01/05/2024;Pix devolvido;-100,00\n02/05/2024;Venda;50,00\n";
        let mut session = UploadedStatement::parse(text, 10)
            .unwrap()
            .confirm_mapping(ColumnMapping::default())
            .unwrap();
        assert_eq!(session.selected_totals(), (dec("50.00"), dec("100.00")));

        session.set_kind(0, TransactionKind::Income).unwrap();
        assert_eq!(session.selected_totals(), (dec("150.00"), Decimal::ZERO));

        session.toggle(1).unwrap();
        assert_eq!(session.selected_totals(), (dec("100.00"), Decimal::ZERO));
    }

    #[test]
    fn test_deselect_and_retype_flow_into_request() {
        let mut session = review();
        assert!(!session.toggle(1).unwrap());
        session.set_kind(2, TransactionKind::Income).unwrap();

        let request = session.into_request(Some("cat-1".into())).unwrap();
        assert_eq!(request.default_category_id.as_deref(), Some("cat-1"));
        assert_eq!(request.transactions.len(), 2);
        assert_eq!(request.transactions[0].description, "Mercado");
        assert_eq!(request.transactions[0].value, dec("150.50"));
        assert_eq!(request.transactions[1].description, "Farmácia");
        assert_eq!(request.transactions[1].kind, TransactionKind::Income);
    }

    #[test]
    fn test_toggle_all_round_trip() {
        let mut session = review();
        session.toggle_all();
        assert_eq!(session.selected_count(), 0);
        session.toggle_all();
        assert_eq!(session.selected_count(), 3);

        session.toggle(0).unwrap();
        session.toggle_all();
        assert_eq!(session.selected_count(), 3);
    }

    #[test]
    fn test_empty_selection_is_rejected() {
        let mut session = review();
        session.select_all(false);
        match session.into_request(None) {
            Err(Error::Validation(msg)) => assert_eq!(msg, "select at least one transaction"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let mut session = review();
        assert!(matches!(session.toggle(99), Err(Error::NotFound(_))));
        assert!(matches!(
            session.set_kind(99, TransactionKind::Expense),
            Err(Error::NotFound(_))
        ));
    }
}
