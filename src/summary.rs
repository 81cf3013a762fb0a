use itertools::Itertools;
use serde::Serialize;

use crate::{
    data::Value,
    reconcile::{Reconciled, RowStatus},
    table::ResultTable,
};

/// `part / whole × 100` rounded to two decimals, ties to even; 0 when
/// `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_source_rows: usize,
    pub total_target_rows: usize,
    pub matched: usize,
    pub value_mismatch: usize,
    pub missing_in_target: usize,
    pub missing_in_source: usize,
    /// Matched over source rows; 0.00 for an empty source.
    pub overall_accuracy: f64,
}

impl Summary {
    pub fn new(
        total_source_rows: usize,
        total_target_rows: usize,
        matched: usize,
        value_mismatch: usize,
        missing_in_target: usize,
        missing_in_source: usize,
    ) -> Self {
        Self {
            total_source_rows,
            total_target_rows,
            matched,
            value_mismatch,
            missing_in_target,
            missing_in_source,
            overall_accuracy: percentage(matched, total_source_rows),
        }
    }

    pub fn from_reconciled(source_rows: usize, target_rows: usize, reconciled: &Reconciled) -> Self {
        let counts = reconciled.rows.iter().map(|row| row.status).counts();
        let count = |status: RowStatus| counts.get(&status).copied().unwrap_or(0);
        Self::new(
            source_rows,
            target_rows,
            count(RowStatus::Matched),
            count(RowStatus::ValueMismatch),
            count(RowStatus::MissingInTarget),
            count(RowStatus::MissingInSource),
        )
    }

    pub fn merged_rows(&self) -> usize {
        self.matched + self.value_mismatch + self.missing_in_target + self.missing_in_source
    }

    pub fn to_table(&self) -> ResultTable {
        let mut table = ResultTable::new("Summary", &["Metric", "Value"]);
        let counts = [
            ("Total Source Rows", self.total_source_rows),
            ("Total Target Rows", self.total_target_rows),
            ("Matched Rows", self.matched),
            ("Value Mismatch Rows", self.value_mismatch),
            ("Missing In Target", self.missing_in_target),
            ("Missing In Source", self.missing_in_source),
        ];
        for (metric, value) in counts {
            table.push(vec![
                Some(Value::Text(metric.to_string())),
                Some(Value::Integer(value as i64)),
            ]);
        }
        table.push(vec![
            Some(Value::Text("Overall Accuracy %".to_string())),
            Some(Value::Float(self.overall_accuracy)),
        ]);
        table
    }
}
