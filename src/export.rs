//! Spreadsheet export of the task table

use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet, XlsxError};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::ExportError;
use crate::store::COLUMNS;
use crate::task::{format_date, Task};

pub const DEFAULT_EXPORT_FILE: &str = "task_report.xlsx";

const SHEET_NAME: &str = "Tasks";
const DATE_NUM_FORMAT: &str = "yyyy-mm-dd";

/// Column widths for ID, Feature, Assignee, dates, Status, Priority, Tags.
const COLUMN_WIDTHS: [f64; 8] = [38.0, 32.0, 18.0, 12.0, 12.0, 12.0, 10.0, 24.0];

/// Picks the export target: blank input falls back to `default`, and a name
/// without an extension gets `.xlsx`.
pub fn export_path(name: &str, default: &str) -> PathBuf {
    let name = name.trim();
    let mut path = PathBuf::from(if name.is_empty() { default } else { name });
    if path.extension().is_none() {
        path.set_extension("xlsx");
    }
    path
}

/// Years a worksheet date cell can hold.
const EXCEL_YEARS: RangeInclusive<u16> = 1900..=9999;

/// Converts a date to a worksheet date, or `None` when its year is outside
/// what a worksheet can represent.
fn excel_date(date: NaiveDate) -> Option<ExcelDateTime> {
    let year = u16::try_from(date.year()).ok().filter(|y| EXCEL_YEARS.contains(y))?;
    ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8).ok()
}

/// Writes a date cell. Dates a worksheet cannot represent are written as
/// ISO text instead.
fn write_date(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    task: &Task,
    date: NaiveDate,
    format: &Format,
) -> Result<(), XlsxError> {
    match excel_date(date) {
        Some(cell) => worksheet.write_datetime_with_format(row, col, &cell, format)?,
        None => {
            warn!(
                "Task '{}' ({}) has date {} outside the spreadsheet range, writing it as text",
                task.feature,
                task.id.short(),
                format_date(date)
            );
            worksheet.write_string(row, col, format_date(date))?
        }
    };
    Ok(())
}

/// Writes the table as a single-sheet workbook, replacing any existing file.
pub fn export_xlsx(tasks: &[Task], path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(DATE_NUM_FORMAT);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, (name, width)) in COLUMNS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, *name, &header_format)?;
        worksheet.set_column_width(col, width)?;
    }

    for (i, task) in tasks.iter().enumerate() {
        let row = i as u32 + 1;
        worksheet.write_string(row, 0, task.id.to_string())?;
        worksheet.write_string(row, 1, &task.feature)?;
        worksheet.write_string(row, 2, &task.assignee)?;
        write_date(worksheet, row, 3, task, task.start_date, &date_format)?;
        write_date(worksheet, row, 4, task, task.due_date, &date_format)?;
        worksheet.write_string(row, 5, task.status.label())?;
        worksheet.write_string(row, 6, task.priority_label())?;
        worksheet.write_string(row, 7, &task.tags)?;
    }

    workbook.save(path)?;
    info!("Exported {} tasks to {}", tasks.len(), path.display());
    Ok(())
}
