//! Report writer: the four result tables as worksheets of one `.xlsx`
//! workbook, or as `<Sheet>.csv` files inside one directory.
//!
//! A report is all-or-nothing. The workbook is serialized in a single
//! save; CSV files are staged in a sibling `.partial` directory and moved
//! into place only once every table has been written.

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::ValueEnum;
use log::{debug, info};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::{
    data::Value,
    error::{ReconError, Result},
    io_utils,
    table::ResultTable,
};

const MAX_EXACT_INTEGER: u64 = 1 << 53;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// One workbook with a worksheet per table
    Xlsx,
    /// One directory with a CSV file per table
    CsvDir,
}

impl ReportFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xlsx") => ReportFormat::Xlsx,
            _ => ReportFormat::CsvDir,
        }
    }
}

pub fn write_report(tables: &[ResultTable], path: &Path, format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Xlsx => write_workbook(tables, path),
        ReportFormat::CsvDir => write_csv_dir(tables, path),
    }?;
    info!("Report with {} table(s) written to {:?}", tables.len(), path);
    Ok(())
}

fn write_workbook(tables: &[ResultTable], path: &Path) -> Result<()> {
    let to_write_error = |e: XlsxError| ReconError::write(path, e);
    let header_format = Format::new().set_bold();
    let mut workbook = Workbook::new();
    for table in tables {
        let worksheet = workbook
            .add_worksheet()
            .set_name(&table.name)
            .map_err(to_write_error)?;
        write_sheet(worksheet, table, &header_format).map_err(|e| {
            ReconError::write(path, format!("Sheet '{}': {e}", table.name))
        })?;
        debug!("Sheet '{}' holds {} row(s)", table.name, table.rows.len());
    }
    workbook.save(path).map_err(to_write_error)
}

fn write_sheet(
    worksheet: &mut Worksheet,
    table: &ResultTable,
    header_format: &Format,
) -> std::result::Result<(), XlsxError> {
    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, column_number(col)?, header, header_format)?;
    }
    for (row_idx, row) in table.rows.iter().enumerate() {
        let row_num = u32::try_from(row_idx + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (col, cell) in row.iter().enumerate() {
            let col = column_number(col)?;
            match cell {
                None => {}
                Some(Value::Integer(i)) if i.unsigned_abs() <= MAX_EXACT_INTEGER => {
                    worksheet.write_number(row_num, col, *i as f64)?;
                }
                Some(Value::Float(f)) => {
                    worksheet.write_number(row_num, col, *f)?;
                }
                Some(Value::Boolean(b)) => {
                    worksheet.write_boolean(row_num, col, *b)?;
                }
                Some(other) => {
                    worksheet.write_string(row_num, col, other.to_string())?;
                }
            }
        }
    }
    worksheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn column_number(col: usize) -> std::result::Result<u16, XlsxError> {
    u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)
}

fn write_csv_dir(tables: &[ResultTable], path: &Path) -> Result<()> {
    if path.exists() {
        return Err(ReconError::write(path, "output directory already exists"));
    }
    let staging = staging_path(path);
    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(|e| ReconError::write(&staging, e))?;
    }
    fs::create_dir_all(&staging).map_err(|e| ReconError::write(&staging, e))?;

    let staged = tables
        .iter()
        .try_for_each(|table| write_csv_table(table, &staging.join(format!("{}.csv", table.name))));
    if let Err(err) = staged {
        let _ = fs::remove_dir_all(&staging);
        return Err(ReconError::write(path, format!("{err:#}")));
    }
    fs::rename(&staging, path).map_err(|e| {
        let _ = fs::remove_dir_all(&staging);
        ReconError::write(path, e)
    })
}

fn write_csv_table(table: &ResultTable, path: &Path) -> anyhow::Result<()> {
    let mut writer = io_utils::open_csv_writer(path, io_utils::DEFAULT_CSV_DELIMITER)?;
    writer.write_record(&table.headers)?;
    for row in table.display_rows() {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "report".into());
    name.push(".partial");
    path.with_file_name(name)
}
