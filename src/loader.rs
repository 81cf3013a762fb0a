//! Table loader: CSV/TSV through the `csv` reader, spreadsheets through
//! `calamine`. Column order and null markers are preserved as read.

use std::{collections::HashSet, path::Path};

use calamine::{Data, Reader, open_workbook_auto};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info};

use crate::{
    data::{self, Value},
    error::{ReconError, Result},
    io_utils,
    table::{Cell, Table},
};

/// Per-input reader settings.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    pub sheet: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
            sheet: None,
        }
    }
}

pub fn load_table(path: &Path, options: &LoadOptions) -> Result<Table> {
    let table = if io_utils::is_workbook(path) {
        load_workbook(path, options.sheet.as_deref())?
    } else {
        load_delimited(path, options)?
    };
    info!(
        "Loaded {} row(s) across {} column(s) from {:?}",
        table.row_count(),
        table.columns.len(),
        path
    );
    Ok(table)
}

fn load_delimited(path: &Path, options: &LoadOptions) -> Result<Table> {
    let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
    debug!(
        "Reading {:?} as delimited text ('{}', {})",
        path,
        io_utils::printable_delimiter(delimiter),
        options.encoding.name()
    );
    let mut reader =
        io_utils::open_csv_reader_from_path(path, delimiter).map_err(|e| ReconError::load(path, format!("{e:#}")))?;
    let headers = io_utils::reader_headers(&mut reader, options.encoding)
        .map_err(|e| ReconError::load(path, format!("Reading header row: {e:#}")))?;
    validate_headers(path, &headers)?;

    let mut rows = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.map_err(|e| ReconError::load(path, format!("Reading row {}: {e}", row_idx + 2)))?;
        let decoded = io_utils::decode_record(&record, options.encoding)
            .map_err(|e| ReconError::load(path, format!("Decoding row {}: {e}", row_idx + 2)))?;
        rows.push(decoded.iter().map(|raw| data::parse_cell(raw)).collect());
    }
    Ok(Table::new(headers, rows))
}

fn load_workbook(path: &Path, sheet: Option<&str>) -> Result<Table> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ReconError::load(path, e))?;
    let sheet_names = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(name) if sheet_names.iter().any(|s| s == name) => name.to_string(),
        Some(name) => {
            return Err(ReconError::load(
                path,
                format!("Sheet '{name}' not found (available: {})", sheet_names.join(", ")),
            ));
        }
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ReconError::load(path, "Workbook contains no sheets"))?,
    };
    debug!("Reading sheet '{sheet_name}' from {:?}", path);

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ReconError::load(path, format!("Reading sheet '{sheet_name}': {e}")))?;
    let mut range_rows = range.rows();
    let headers = match range_rows.next() {
        Some(header_row) => header_row.iter().map(header_text).collect::<Vec<_>>(),
        None => return Err(ReconError::load(path, format!("Sheet '{sheet_name}' is empty"))),
    };
    validate_headers(path, &headers)?;

    let rows = range_rows
        .map(|row| row.iter().take(headers.len()).map(workbook_cell).collect())
        .collect();
    Ok(Table::new(headers, rows))
}

fn validate_headers(path: &Path, headers: &[String]) -> Result<()> {
    if headers.is_empty() {
        return Err(ReconError::load(path, "Header row is empty"));
    }
    let mut seen = HashSet::new();
    for (idx, header) in headers.iter().enumerate() {
        if header.trim().is_empty() {
            return Err(ReconError::load(
                path,
                format!("Column {} has an empty header", idx + 1),
            ));
        }
        if !seen.insert(header.as_str()) {
            return Err(ReconError::load(path, format!("Duplicate column '{header}'")));
        }
    }
    Ok(())
}

fn header_text(cell: &Data) -> String {
    match workbook_cell(cell) {
        Some(value) => value.to_string(),
        None => String::new(),
    }
}

fn workbook_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if data::is_null_token(s) => None,
        Data::String(s) => Some(Value::Text(s.clone())),
        Data::Int(i) => Some(Value::Integer(*i)),
        // Spreadsheets store every number as a double.
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(Value::Integer(*f as i64)),
        Data::Float(f) => Some(Value::Float(*f)),
        Data::Bool(b) => Some(Value::Boolean(*b)),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64()).map(data::temporal_value),
        Data::DateTimeIso(s) => Some(
            data::parse_naive_datetime(s)
                .map(Value::DateTime)
                .or_else(|_| data::parse_naive_date(s).map(Value::Date))
                .unwrap_or_else(|_| Value::Text(s.clone())),
        ),
        Data::DurationIso(s) => Some(Value::Text(s.clone())),
    }
}

/// Convert a 1900-system serial date. Serials below 60 precede the
/// phantom 1900-02-29 and shift by one day.
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let adjusted = if serial < 60.0 { serial + 1.0 } else { serial };
    let millis = (adjusted * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}
