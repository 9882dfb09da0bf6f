//! Tabulated CSV content

use serde::{Deserialize, Serialize};

use super::mapping::ColumnMapping;

/// Headers plus rows of an uploaded statement
///
/// Every row holds exactly `headers.len()` cells. Missing cells are stored
/// as empty strings so column positions stay stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding short rows with empty cells and dropping
    /// cells past the header width.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of one column over the first `limit` rows
    pub fn column_sample(&self, index: usize, limit: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .take(limit)
            .filter_map(move |row| row.get(index).map(String::as_str))
    }
}

/// Upload entry point response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub sample_data: Vec<Vec<String>>,
    pub total_rows: usize,
    pub detected_columns: ColumnMapping,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut table = RawTable::new(cells(&["Data", "Descrição", "Valor"]));
        table.push_row(cells(&["01/05/2024"]));
        assert_eq!(table.rows()[0], cells(&["01/05/2024", "", ""]));
    }

    #[test]
    fn test_long_rows_are_truncated() {
        let mut table = RawTable::new(cells(&["a", "b"]));
        table.push_row(cells(&["1", "2", "3"]));
        assert_eq!(table.rows()[0].len(), 2);
    }

    #[test]
    fn test_empty_header_cells_keep_position() {
        let mut table = RawTable::new(cells(&["", "Valor"]));
        table.push_row(cells(&["x", "10"]));
        assert_eq!(table.width(), 2);
        assert_eq!(table.column_sample(1, 10).collect::<Vec<_>>(), vec!["10"]);
    }
}
