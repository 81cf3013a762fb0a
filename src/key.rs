use std::collections::HashSet;

use log::{debug, info};

use crate::{
    error::{ReconError, Result},
    table::Table,
};

/// First column, in declared order, whose values are all present and
/// pairwise distinct. A table without rows has no usable key.
pub fn select_primary_key(table: &Table) -> Result<String> {
    if table.row_count() == 0 {
        return Err(ReconError::NoPrimaryKey {
            reason: "table has no rows".to_string(),
        });
    }
    for (idx, column) in table.columns.iter().enumerate() {
        if is_key_candidate(table, idx) {
            info!("Selected '{column}' as primary key");
            return Ok(column.clone());
        }
        debug!("Column '{column}' is not a key candidate");
    }
    Err(ReconError::NoPrimaryKey {
        reason: format!(
            "none of the {} column(s) is both unique and fully non-null",
            table.columns.len()
        ),
    })
}

fn is_key_candidate(table: &Table, index: usize) -> bool {
    let mut seen = HashSet::with_capacity(table.row_count());
    table.column_values(index).all(|value| match value {
        Some(value) => seen.insert(value.join_key()),
        None => false,
    })
}
