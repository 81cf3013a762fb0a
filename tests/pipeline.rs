mod common;

use common::table;
use data_recon::{
    data::Value,
    error::ReconError,
    pipeline::reconcile,
    reconcile::RowStatus,
    schema::LogicalType,
};

fn statuses(run: &data_recon::pipeline::Reconciliation) -> Vec<RowStatus> {
    run.reconciled.rows.iter().map(|row| row.status).collect()
}

#[test]
fn identical_tables_are_fully_matched() {
    let source = table(&["id", "name"], &[&["1", "A"], &["2", "B"]]);
    let target = table(&["id", "name"], &[&["1", "A"], &["2", "B"]]);

    let run = reconcile(&source, &target).expect("reconcile");

    assert_eq!(run.primary_key, "id");
    assert_eq!(run.summary.matched, 2);
    assert_eq!(run.summary.value_mismatch, 0);
    assert_eq!(run.summary.missing_in_target, 0);
    assert_eq!(run.summary.missing_in_source, 0);
    assert_eq!(run.summary.overall_accuracy, 100.0);
    assert!(run.schema.iter().all(|check| check.matches));
}

#[test]
fn rows_absent_on_either_side_are_classified_missing() {
    let source = table(&["id", "name"], &[&["1", "A"], &["3", "C"]]);
    let target = table(&["id", "name"], &[&["1", "A"], &["4", "D"]]);

    let run = reconcile(&source, &target).expect("reconcile");
    let details = &run.result_tables()[3];
    let status_col = details.headers.len() - 1;

    let missing_target = details
        .rows
        .iter()
        .find(|row| row[status_col] == Some(Value::Text("MISSING_IN_TARGET".into())))
        .expect("missing in target row");
    assert_eq!(missing_target[0], Some(Value::Integer(3)));

    let missing_source = details
        .rows
        .iter()
        .find(|row| row[status_col] == Some(Value::Text("MISSING_IN_SOURCE".into())))
        .expect("missing in source row");
    assert_eq!(missing_source[0], Some(Value::Integer(4)));

    assert_eq!(run.summary.missing_in_target, 1);
    assert_eq!(run.summary.missing_in_source, 1);
    assert_eq!(run.summary.overall_accuracy, 50.0);
}

#[test]
fn changed_value_is_a_mismatch_and_costs_one_match() {
    let source = table(&["id", "name"], &[&["1", "A"], &["2", "B"]]);
    let target = table(&["id", "name"], &[&["1", "A"], &["2", "X"]]);

    let run = reconcile(&source, &target).expect("reconcile");

    assert_eq!(statuses(&run), vec![RowStatus::Matched, RowStatus::ValueMismatch]);
    let name = run
        .reconciled
        .column_accuracy
        .iter()
        .find(|record| record.column == "name")
        .expect("name accuracy");
    assert_eq!(name.match_count + 1, name.total_compared);
}

#[test]
fn missing_primary_key_aborts_before_any_output() {
    let source = table(&["code", "label"], &[&["a", ""], &["a", "x"]]);
    let target = table(&["code", "label"], &[&["a", "x"]]);

    let err = reconcile(&source, &target).expect_err("no key");
    assert!(matches!(err, ReconError::NoPrimaryKey { .. }));
}

#[test]
fn empty_source_has_no_primary_key() {
    let source = table(&["id", "name"], &[]);
    let target = table(&["id", "name"], &[&["1", "A"]]);

    let err = reconcile(&source, &target).expect_err("empty source");
    assert_eq!(err.stage(), "key selection");
}

#[test]
fn status_counts_sum_to_merged_rows() {
    let source = table(
        &["id", "v"],
        &[&["1", "a"], &["2", "b"], &["3", "c"], &["4", "d"]],
    );
    let target = table(
        &["id", "v"],
        &[&["2", "b"], &["3", "z"], &["3", "c"], &["9", "q"]],
    );

    let run = reconcile(&source, &target).expect("reconcile");

    assert_eq!(run.summary.merged_rows(), run.reconciled.rows.len());
    assert_eq!(run.reconciled.rows.len(), 6);
    assert_eq!(run.reconciled.duplicate_target_keys, 1);
    assert_eq!(
        statuses(&run),
        vec![
            RowStatus::MissingInTarget,
            RowStatus::Matched,
            RowStatus::ValueMismatch,
            RowStatus::Matched,
            RowStatus::MissingInTarget,
            RowStatus::MissingInSource,
        ]
    );
}

#[test]
fn schema_divergence_is_reported_without_blocking_reconciliation() {
    let source = table(&["id", "amount", "legacy"], &[&["1", "10", "x"]]);
    let target = table(&["id", "amount"], &[&["1", "10.5"]]);

    let run = reconcile(&source, &target).expect("reconcile");

    assert_eq!(run.schema[1].source_type, LogicalType::Integer);
    assert_eq!(run.schema[1].target_type, Some(LogicalType::Float));
    assert_eq!(run.schema[2].target_label(), "MISSING");
    assert_eq!(run.reconciled.column_accuracy.len(), 1);
    assert_eq!(run.summary.value_mismatch, 1);
}

#[test]
fn fingerprint_column_avoids_existing_row_hash() {
    let source = table(&["id", "ROW_HASH"], &[&["1", "h"]]);
    let target = table(&["id", "ROW_HASH"], &[&["1", "h"]]);

    let run = reconcile(&source, &target).expect("reconcile");

    assert_eq!(run.reconciled.fingerprint_column, "ROW_HASH_1");
    let details = &run.result_tables()[3];
    assert!(details.headers.contains(&"ROW_HASH_source".to_string()));
    assert!(details.headers.contains(&"ROW_HASH_1_source".to_string()));
    assert!(details.headers.contains(&"ROW_HASH_1_target".to_string()));
    assert_eq!(run.summary.matched, 1);
}

#[test]
fn result_tables_come_in_report_order() {
    let source = table(&["id", "name"], &[&["1", "A"]]);
    let target = table(&["id", "name"], &[&["1", "A"]]);

    let run = reconcile(&source, &target).expect("reconcile");
    let names = run
        .result_tables()
        .into_iter()
        .map(|t| t.name)
        .collect::<Vec<_>>();

    assert_eq!(
        names,
        vec![
            "Summary",
            "Schema_Validation",
            "Column_Accuracy",
            "Row_Level_Details"
        ]
    );
}
