//! In-memory tables: the loaded inputs and the named result tables.

use crate::data::Value;

pub type Cell = Option<Value>;
pub type Row = Vec<Cell>;

/// Column-ordered table as produced by the loader. Never mutated in place;
/// derivations return new tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cells of one column, top to bottom. Short rows read as null.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = Option<&Value>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).and_then(Option::as_ref))
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(Option::as_ref)
    }

    /// Copy of this table with one extra column appended.
    pub fn with_column(&self, name: &str, values: Vec<Cell>) -> Table {
        debug_assert_eq!(values.len(), self.rows.len());
        let mut columns = self.columns.clone();
        columns.push(name.to_string());
        let rows = self
            .rows
            .iter()
            .zip(values)
            .map(|(row, value)| {
                let mut extended = row.clone();
                extended.resize(self.columns.len(), None);
                extended.push(value);
                extended
            })
            .collect();
        Table { columns, rows }
    }
}

/// A named output table, one per report sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultTable {
    pub fn new(name: &str, headers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Display strings for console rendering; nulls render empty.
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_ref().map(Value::to_string).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}
