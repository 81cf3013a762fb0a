//! Row fingerprints: SHA-256 over the canonical cell encodings joined by
//! the ASCII unit separator, rendered as lowercase hex.

use sha2::{Digest, Sha256};

use crate::{
    data::{Value, canonical_cell},
    table::Table,
};

pub const FINGERPRINT_COLUMN: &str = "ROW_HASH";
pub const FIELD_SEPARATOR: &str = "\u{1f}";

pub fn fingerprint_row<'a, I>(cells: I) -> String
where
    I: IntoIterator<Item = Option<&'a Value>>,
{
    let payload = cells
        .into_iter()
        .map(canonical_cell)
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR);
    let digest = Sha256::digest(payload.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// One fingerprint per row, over every column in declared order.
pub fn fingerprint_table(table: &Table) -> Vec<String> {
    let width = table.columns.len();
    table
        .rows
        .iter()
        .map(|row| fingerprint_row((0..width).map(|idx| row.get(idx).and_then(Option::as_ref))))
        .collect()
}

/// Name for the fingerprint column that collides with neither table.
pub fn fingerprint_column_name(source: &Table, target: &Table) -> String {
    let taken = |name: &str| source.has_column(name) || target.has_column(name);
    let mut candidate = FINGERPRINT_COLUMN.to_string();
    let mut counter = 1usize;
    while taken(&candidate) {
        candidate = format!("{FINGERPRINT_COLUMN}_{counter}");
        counter += 1;
    }
    candidate
}

/// Copy of `table` with its fingerprints appended under `column`.
pub fn with_fingerprints(table: &Table, column: &str) -> Table {
    let values = fingerprint_table(table)
        .into_iter()
        .map(|digest| Some(Value::Text(digest)))
        .collect();
    table.with_column(column, values)
}
