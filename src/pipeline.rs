//! The reconciliation pass as one explicit context value.
//!
//! Each stage consumes the previous stage's output and nothing else; the
//! finished [`Reconciliation`] is immutable and carries every derived
//! artifact the report needs.

use log::info;

use crate::{
    error::Result,
    fingerprint::{fingerprint_column_name, with_fingerprints},
    key::select_primary_key,
    reconcile::{self, Reconciled},
    schema::{self, SchemaCheck},
    summary::Summary,
    table::{ResultTable, Table},
};

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub schema: Vec<SchemaCheck>,
    pub primary_key: String,
    pub source: Table,
    pub target: Table,
    pub reconciled: Reconciled,
    pub summary: Summary,
}

pub fn reconcile(source: &Table, target: &Table) -> Result<Reconciliation> {
    let schema = schema::compare_schemas(source, target);
    let primary_key = select_primary_key(source)?;

    let fingerprint_column = fingerprint_column_name(source, target);
    let hashed_source = with_fingerprints(source, &fingerprint_column);
    let hashed_target = with_fingerprints(target, &fingerprint_column);

    let reconciled = reconcile::reconcile_rows(
        &hashed_source,
        &hashed_target,
        &primary_key,
        &fingerprint_column,
    )?;
    let summary = Summary::from_reconciled(source.row_count(), target.row_count(), &reconciled);
    info!(
        "Reconciled {} source / {} target row(s): {} matched, {} mismatched, {} missing in target, {} missing in source",
        summary.total_source_rows,
        summary.total_target_rows,
        summary.matched,
        summary.value_mismatch,
        summary.missing_in_target,
        summary.missing_in_source
    );

    Ok(Reconciliation {
        schema,
        primary_key,
        source: hashed_source,
        target: hashed_target,
        reconciled,
        summary,
    })
}

impl Reconciliation {
    /// The four report tables in sheet order.
    pub fn result_tables(&self) -> Vec<ResultTable> {
        vec![
            self.summary.to_table(),
            schema::schema_table(&self.schema),
            reconcile::column_accuracy_table(&self.reconciled.column_accuracy),
            reconcile::row_details_table(&self.source, &self.target, &self.reconciled),
        ]
    }
}
