//! Logical type inference and source/target schema comparison.
//!
//! A column's type is the narrowest [`LogicalType`] covering all of its
//! non-null cells:
//!
//! - only integers → `integer`; integers mixed with floats → `float`
//! - only booleans → `boolean`
//! - only dates → `date`; dates mixed with timestamps → `datetime`
//! - no non-null cells → `null`
//! - anything else → `text`
//!
//! Inference runs independently on each table, so the same column may
//! legitimately disagree between source and target.

use std::fmt;

use log::{debug, info, warn};
use serde::{Serialize, Serializer};

use crate::{
    data::Value,
    table::{ResultTable, Table},
};

pub const MISSING_TYPE: &str = "MISSING";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalType {
    Null,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Text,
}

impl LogicalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalType::Null => "null",
            LogicalType::Integer => "integer",
            LogicalType::Float => "float",
            LogicalType::Boolean => "boolean",
            LogicalType::Date => "date",
            LogicalType::DateTime => "datetime",
            LogicalType::Text => "text",
        }
    }

    fn of(value: &Value) -> Self {
        match value {
            Value::Integer(_) => LogicalType::Integer,
            Value::Float(_) => LogicalType::Float,
            Value::Boolean(_) => LogicalType::Boolean,
            Value::Date(_) => LogicalType::Date,
            Value::DateTime(_) => LogicalType::DateTime,
            Value::Text(_) => LogicalType::Text,
        }
    }

    /// Least upper bound of two observed types.
    fn widen(self, other: LogicalType) -> LogicalType {
        use LogicalType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Null, b) => b,
            (a, Null) => a,
            (Integer, Float) | (Float, Integer) => Float,
            (Date, DateTime) | (DateTime, Date) => DateTime,
            _ => Text,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LogicalType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

pub fn infer_column_type<'a, I>(values: I) -> LogicalType
where
    I: IntoIterator<Item = Option<&'a Value>>,
{
    values
        .into_iter()
        .flatten()
        .map(LogicalType::of)
        .fold(LogicalType::Null, LogicalType::widen)
}

/// Inferred `(column, type)` pairs in declared column order.
pub fn infer_schema(table: &Table) -> Vec<(String, LogicalType)> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.clone(), infer_column_type(table.column_values(idx))))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaCheck {
    pub column: String,
    pub source_type: LogicalType,
    /// `None` when the target has no column of this name.
    pub target_type: Option<LogicalType>,
    pub matches: bool,
}

impl SchemaCheck {
    pub fn target_label(&self) -> &'static str {
        self.target_type
            .as_ref()
            .map(LogicalType::as_str)
            .unwrap_or(MISSING_TYPE)
    }
}

/// One record per source column, in source order.
pub fn compare_schemas(source: &Table, target: &Table) -> Vec<SchemaCheck> {
    let target_schema = infer_schema(target);
    let checks = infer_schema(source)
        .into_iter()
        .map(|(column, source_type)| {
            let target_type = target_schema
                .iter()
                .find(|(name, _)| *name == column)
                .map(|(_, ty)| *ty);
            let matches = target_type == Some(source_type);
            debug!(
                "Column '{}': source {} vs target {}",
                column,
                source_type,
                target_type.map(|t| t.as_str()).unwrap_or(MISSING_TYPE)
            );
            SchemaCheck {
                column,
                source_type,
                target_type,
                matches,
            }
        })
        .collect::<Vec<_>>();

    let mismatched = checks.iter().filter(|check| !check.matches).count();
    if mismatched > 0 {
        warn!("{mismatched} column(s) disagree between source and target schemas");
    }
    for extra in target.columns.iter().filter(|c| !source.has_column(c)) {
        info!("Column '{extra}' exists only in the target table");
    }
    checks
}

pub fn schema_table(checks: &[SchemaCheck]) -> ResultTable {
    let mut table = ResultTable::new(
        "Schema_Validation",
        &["Column", "Source_Type", "Target_Type", "Schema_Match"],
    );
    for check in checks {
        table.push(vec![
            Some(Value::Text(check.column.clone())),
            Some(Value::Text(check.source_type.as_str().to_string())),
            Some(Value::Text(check.target_label().to_string())),
            Some(Value::Boolean(check.matches)),
        ]);
    }
    table
}
