//! Outer join on the primary key, per-row classification and per-column
//! accuracy.
//!
//! Merged rows come out in source order, each source row fanned out over
//! its target matches in target order, followed by target-only rows in
//! target order. A key repeated in the target yields one merged row per
//! pairing; that fan-out is accepted and logged, not rejected.

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    data::{Value, values_equal},
    error::{ReconError, Result},
    summary::percentage,
    table::{ResultTable, Table},
};

pub const JOIN_SIDE_COLUMN: &str = "Join_Side";
pub const ROW_STATUS_COLUMN: &str = "Row_Status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinSide {
    Both,
    SourceOnly,
    TargetOnly,
}

impl JoinSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinSide::Both => "both",
            JoinSide::SourceOnly => "source_only",
            JoinSide::TargetOnly => "target_only",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowStatus {
    Matched,
    ValueMismatch,
    MissingInTarget,
    MissingInSource,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::Matched => "MATCHED",
            RowStatus::ValueMismatch => "VALUE_MISMATCH",
            RowStatus::MissingInTarget => "MISSING_IN_TARGET",
            RowStatus::MissingInSource => "MISSING_IN_SOURCE",
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one merged row. Only rows present on both sides look at the
/// fingerprints.
pub fn classify(side: JoinSide, source_fp: Option<&str>, target_fp: Option<&str>) -> RowStatus {
    match side {
        JoinSide::Both if source_fp == target_fp => RowStatus::Matched,
        JoinSide::Both => RowStatus::ValueMismatch,
        JoinSide::SourceOnly => RowStatus::MissingInTarget,
        JoinSide::TargetOnly => RowStatus::MissingInSource,
    }
}

/// A row of the outer join, as indices into the fingerprinted inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRow {
    pub source_row: Option<usize>,
    pub target_row: Option<usize>,
    pub side: JoinSide,
    pub status: RowStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnAccuracy {
    pub column: String,
    pub match_count: usize,
    pub total_compared: usize,
    pub match_percentage: f64,
}

#[derive(Debug, Clone)]
pub struct Reconciled {
    pub key: String,
    pub fingerprint_column: String,
    pub rows: Vec<MergedRow>,
    pub column_accuracy: Vec<ColumnAccuracy>,
    pub duplicate_target_keys: usize,
}

/// Join `source` and `target` (both already carrying `fingerprint_column`)
/// on `key` and classify every merged row.
pub fn reconcile_rows(
    source: &Table,
    target: &Table,
    key: &str,
    fingerprint_column: &str,
) -> Result<Reconciled> {
    let source_key = source
        .column_index(key)
        .ok_or_else(|| ReconError::NoPrimaryKey {
            reason: format!("key column '{key}' is not present in the source table"),
        })?;
    let target_key = target
        .column_index(key)
        .ok_or_else(|| ReconError::KeyNotInTarget {
            column: key.to_string(),
        })?;
    let source_fp = source.column_index(fingerprint_column);
    let target_fp = target.column_index(fingerprint_column);

    let mut target_lookup: HashMap<String, Vec<usize>> = HashMap::new();
    for (row_idx, value) in target.column_values(target_key).enumerate() {
        if let Some(value) = value {
            target_lookup.entry(value.join_key()).or_default().push(row_idx);
        }
    }
    let duplicate_target_keys = target_lookup.values().filter(|rows| rows.len() > 1).count();
    if duplicate_target_keys > 0 {
        warn!(
            "{duplicate_target_keys} key value(s) repeat in the target table; matching source rows fan out"
        );
    }

    let fingerprint = |table: &Table, column: Option<usize>, row: usize| -> Option<String> {
        column
            .and_then(|col| table.cell(row, col))
            .map(Value::canonical)
    };

    let mut rows = Vec::with_capacity(source.row_count().max(target.row_count()));
    let mut target_matched = vec![false; target.row_count()];
    for source_row in 0..source.row_count() {
        let matches = source
            .cell(source_row, source_key)
            .and_then(|value| target_lookup.get(&value.join_key()));
        match matches {
            Some(target_rows) => {
                let source_digest = fingerprint(source, source_fp, source_row);
                for &target_row in target_rows {
                    target_matched[target_row] = true;
                    let target_digest = fingerprint(target, target_fp, target_row);
                    rows.push(MergedRow {
                        source_row: Some(source_row),
                        target_row: Some(target_row),
                        side: JoinSide::Both,
                        status: classify(
                            JoinSide::Both,
                            source_digest.as_deref(),
                            target_digest.as_deref(),
                        ),
                    });
                }
            }
            None => rows.push(MergedRow {
                source_row: Some(source_row),
                target_row: None,
                side: JoinSide::SourceOnly,
                status: classify(JoinSide::SourceOnly, None, None),
            }),
        }
    }
    for (target_row, matched) in target_matched.iter().enumerate() {
        if !matched {
            rows.push(MergedRow {
                source_row: None,
                target_row: Some(target_row),
                side: JoinSide::TargetOnly,
                status: classify(JoinSide::TargetOnly, None, None),
            });
        }
    }
    info!(
        "Outer join on '{key}' produced {} merged row(s)",
        rows.len()
    );

    let column_accuracy = column_accuracy(source, target, key, fingerprint_column, &rows);
    Ok(Reconciled {
        key: key.to_string(),
        fingerprint_column: fingerprint_column.to_string(),
        rows,
        column_accuracy,
        duplicate_target_keys,
    })
}

/// Exact-equality hit rate for every shared non-key column, over all
/// merged rows whose source cell is non-null.
fn column_accuracy(
    source: &Table,
    target: &Table,
    key: &str,
    fingerprint_column: &str,
    rows: &[MergedRow],
) -> Vec<ColumnAccuracy> {
    let mut results = Vec::new();
    for (source_col, column) in source.columns.iter().enumerate() {
        if column == key || column == fingerprint_column {
            continue;
        }
        let Some(target_col) = target.column_index(column) else {
            debug!("Skipping accuracy for '{column}': absent from target");
            continue;
        };
        let mut match_count = 0usize;
        let mut total_compared = 0usize;
        for row in rows {
            let source_value = row.source_row.and_then(|r| source.cell(r, source_col));
            let target_value = row.target_row.and_then(|r| target.cell(r, target_col));
            if source_value.is_some() {
                total_compared += 1;
            }
            if values_equal(source_value, target_value) {
                match_count += 1;
            }
        }
        results.push(ColumnAccuracy {
            column: column.clone(),
            match_count,
            total_compared,
            match_percentage: percentage(match_count, total_compared),
        });
    }
    results
}

pub fn column_accuracy_table(accuracy: &[ColumnAccuracy]) -> ResultTable {
    let mut table = ResultTable::new(
        "Column_Accuracy",
        &["Column", "Match_Count", "Total_Compared", "Match_Percentage"],
    );
    for record in accuracy {
        table.push(vec![
            Some(Value::Text(record.column.clone())),
            Some(Value::Integer(record.match_count as i64)),
            Some(Value::Integer(record.total_compared as i64)),
            Some(Value::Float(record.match_percentage)),
        ]);
    }
    table
}

/// Every merged row with both sides' columns, the join side and the status.
/// Columns present on both sides carry `_source` / `_target` suffixes; a
/// suffixed label that is already taken gets a numeric tail.
pub fn row_details_table(source: &Table, target: &Table, reconciled: &Reconciled) -> ResultTable {
    let key = reconciled.key.as_str();
    let fingerprint = reconciled.fingerprint_column.as_str();
    let side_columns = |table: &Table, other: &Table, suffix: &str| -> Vec<(usize, String, bool)> {
        let mut columns = table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, name)| *name != key && *name != fingerprint)
            .map(|(idx, name)| {
                if other.has_column(name) {
                    (idx, format!("{name}{suffix}"), true)
                } else {
                    (idx, name.clone(), false)
                }
            })
            .collect::<Vec<_>>();
        if let Some(idx) = table.column_index(fingerprint) {
            columns.push((idx, format!("{fingerprint}{suffix}"), true));
        }
        columns
    };
    let mut source_columns = side_columns(source, target, "_source");
    let mut target_columns = side_columns(target, source, "_target");

    let mut taken: HashSet<String> = [key, JOIN_SIDE_COLUMN, ROW_STATUS_COLUMN]
        .iter()
        .map(|name| name.to_string())
        .collect();
    // Unsuffixed names claim their labels before generated ones.
    for suffixed in [false, true] {
        for (_, label, _) in source_columns
            .iter_mut()
            .chain(target_columns.iter_mut())
            .filter(|(_, _, s)| *s == suffixed)
        {
            *label = unique_label(&mut taken, label.as_str());
        }
    }
    let source_columns: Vec<(usize, String)> = source_columns
        .into_iter()
        .map(|(idx, label, _)| (idx, label))
        .collect();
    let target_columns: Vec<(usize, String)> = target_columns
        .into_iter()
        .map(|(idx, label, _)| (idx, label))
        .collect();
    let source_key = source.column_index(key);
    let target_key = target.column_index(key);

    let mut headers = vec![key.to_string()];
    headers.extend(source_columns.iter().map(|(_, label)| label.clone()));
    headers.extend(target_columns.iter().map(|(_, label)| label.clone()));
    headers.push(JOIN_SIDE_COLUMN.to_string());
    headers.push(ROW_STATUS_COLUMN.to_string());

    let rows = reconciled
        .rows
        .iter()
        .map(|merged| {
            let source_cell =
                |col: usize| merged.source_row.and_then(|r| source.cell(r, col)).cloned();
            let target_cell =
                |col: usize| merged.target_row.and_then(|r| target.cell(r, col)).cloned();
            let key_value = source_key
                .and_then(&source_cell)
                .or_else(|| target_key.and_then(&target_cell));
            let mut row = Vec::with_capacity(headers.len());
            row.push(key_value);
            row.extend(source_columns.iter().map(|(idx, _)| source_cell(*idx)));
            row.extend(target_columns.iter().map(|(idx, _)| target_cell(*idx)));
            row.push(Some(Value::Text(merged.side.as_str().to_string())));
            row.push(Some(Value::Text(merged.status.as_str().to_string())));
            row
        })
        .collect();

    ResultTable {
        name: "Row_Level_Details".to_string(),
        headers,
        rows,
    }
}

fn unique_label(taken: &mut HashSet<String>, base: &str) -> String {
    let mut candidate = base.to_string();
    let mut counter = 1usize;
    while taken.contains(&candidate) {
        candidate = format!("{base}_{counter}");
        counter += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::parse_cell, fingerprint::with_fingerprints};

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        let plain = Table::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|raw| parse_cell(raw)).collect())
                .collect(),
        );
        with_fingerprints(&plain, "ROW_HASH")
    }

    fn statuses(reconciled: &Reconciled) -> Vec<RowStatus> {
        reconciled.rows.iter().map(|row| row.status).collect()
    }

    #[test]
    fn classify_follows_precedence() {
        assert_eq!(classify(JoinSide::Both, Some("a"), Some("a")), RowStatus::Matched);
        assert_eq!(
            classify(JoinSide::Both, Some("a"), Some("b")),
            RowStatus::ValueMismatch
        );
        assert_eq!(
            classify(JoinSide::SourceOnly, Some("a"), None),
            RowStatus::MissingInTarget
        );
        assert_eq!(
            classify(JoinSide::TargetOnly, None, Some("a")),
            RowStatus::MissingInSource
        );
    }

    #[test]
    fn identical_tables_match_everywhere() {
        let source = table(&["id", "name"], &[&["1", "A"], &["2", "B"]]);
        let target = table(&["id", "name"], &[&["1", "A"], &["2", "B"]]);
        let result = reconcile_rows(&source, &target, "id", "ROW_HASH").unwrap();
        assert_eq!(statuses(&result), vec![RowStatus::Matched; 2]);
        assert_eq!(result.column_accuracy[0].match_percentage, 100.0);
    }

    #[test]
    fn one_sided_keys_are_reported_missing() {
        let source = table(&["id", "name"], &[&["1", "A"], &["3", "C"]]);
        let target = table(&["id", "name"], &[&["1", "A"], &["4", "D"]]);
        let result = reconcile_rows(&source, &target, "id", "ROW_HASH").unwrap();
        assert_eq!(
            statuses(&result),
            vec![
                RowStatus::Matched,
                RowStatus::MissingInTarget,
                RowStatus::MissingInSource
            ]
        );
        assert_eq!(result.rows[1].source_row, Some(1));
        assert_eq!(result.rows[2].target_row, Some(1));
    }

    #[test]
    fn differing_value_is_a_mismatch_and_lowers_accuracy() {
        let source = table(&["id", "name"], &[&["1", "A"], &["2", "B"]]);
        let target = table(&["id", "name"], &[&["1", "A"], &["2", "Z"]]);
        let result = reconcile_rows(&source, &target, "id", "ROW_HASH").unwrap();
        assert_eq!(result.rows[1].status, RowStatus::ValueMismatch);
        let name = &result.column_accuracy[0];
        assert_eq!(name.column, "name");
        assert_eq!(name.total_compared, 2);
        assert_eq!(name.match_count, 1);
        assert_eq!(name.match_percentage, 50.0);
    }

    #[test]
    fn duplicate_target_keys_fan_out() {
        let source = table(&["id", "name"], &[&["1", "A"]]);
        let target = table(&["id", "name"], &[&["1", "A"], &["1", "B"]]);
        let result = reconcile_rows(&source, &target, "id", "ROW_HASH").unwrap();
        assert_eq!(result.duplicate_target_keys, 1);
        assert_eq!(
            statuses(&result),
            vec![RowStatus::Matched, RowStatus::ValueMismatch]
        );
    }

    #[test]
    fn null_cells_count_only_when_source_present() {
        let source = table(&["id", "note"], &[&["1", ""], &["2", "x"]]);
        let target = table(&["id", "note"], &[&["1", ""], &["2", "x"]]);
        let result = reconcile_rows(&source, &target, "id", "ROW_HASH").unwrap();
        let note = &result.column_accuracy[0];
        assert_eq!((note.match_count, note.total_compared), (1, 1));
        assert_eq!(statuses(&result), vec![RowStatus::Matched; 2]);
    }

    #[test]
    fn accuracy_skips_columns_missing_from_target_and_handles_empty_denominator() {
        let source = table(&["id", "only_src", "blank"], &[&["1", "a", ""]]);
        let target = table(&["id", "blank"], &[&["1", ""]]);
        let result = reconcile_rows(&source, &target, "id", "ROW_HASH").unwrap();
        assert_eq!(result.column_accuracy.len(), 1);
        let blank = &result.column_accuracy[0];
        assert_eq!(blank.total_compared, 0);
        assert_eq!(blank.match_percentage, 0.0);
    }

    #[test]
    fn missing_key_in_target_is_fatal() {
        let source = table(&["id"], &[&["1"]]);
        let target = table(&["other"], &[&["1"]]);
        assert!(matches!(
            reconcile_rows(&source, &target, "id", "ROW_HASH"),
            Err(ReconError::KeyNotInTarget { .. })
        ));
    }

    #[test]
    fn integer_and_float_keys_join() {
        let source = table(&["id", "v"], &[&["1", "a"]]);
        let target = table(&["id", "v"], &[&["1.0", "a"]]);
        let result = reconcile_rows(&source, &target, "id", "ROW_HASH").unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].side, JoinSide::Both);
        // "1" and "1.0" stringify differently, so the rows are not identical.
        assert_eq!(result.rows[0].status, RowStatus::ValueMismatch);
        assert_eq!(result.column_accuracy[0].match_count, 1);
    }

    #[test]
    fn row_details_layout_suffixes_shared_columns() {
        let source = table(&["id", "name", "src_only"], &[&["1", "A", "s"]]);
        let target = table(&["id", "name", "tgt_only"], &[&["2", "B", "t"]]);
        let result = reconcile_rows(&source, &target, "id", "ROW_HASH").unwrap();
        let details = row_details_table(&source, &target, &result);
        assert_eq!(
            details.headers,
            vec![
                "id",
                "name_source",
                "src_only",
                "ROW_HASH_source",
                "name_target",
                "tgt_only",
                "ROW_HASH_target",
                "Join_Side",
                "Row_Status"
            ]
        );
        assert_eq!(details.rows.len(), 2);
        assert_eq!(details.rows[0][0], Some(Value::Integer(1)));
        assert_eq!(details.rows[0][4], None);
        assert_eq!(details.rows[1][0], Some(Value::Integer(2)));
        assert_eq!(
            details.rows[1][8],
            Some(Value::Text("MISSING_IN_SOURCE".into()))
        );
    }

    #[test]
    fn row_details_headers_stay_unique_when_suffix_is_taken() {
        let source = table(&["id", "a", "a_source", "Join_Side"], &[&["1", "x", "y", "z"]]);
        let target = table(&["id", "a"], &[&["1", "x"]]);
        let result = reconcile_rows(&source, &target, "id", "ROW_HASH").unwrap();
        let details = row_details_table(&source, &target, &result);
        assert_eq!(
            details.headers,
            vec![
                "id",
                "a_source_1",
                "a_source",
                "Join_Side_1",
                "ROW_HASH_source",
                "a_target",
                "ROW_HASH_target",
                "Join_Side",
                "Row_Status"
            ]
        );
        let distinct: HashSet<&String> = details.headers.iter().collect();
        assert_eq!(distinct.len(), details.headers.len());
        assert_eq!(details.rows[0][1], Some(Value::Text("x".into())));
        assert_eq!(details.rows[0][2], Some(Value::Text("y".into())));
    }
}
