//! Loading spreadsheet files into ordered rows of named string cells.
//!
//! Workbooks (`.xlsx`, `.xls`, `.ods`, ...) go through calamine and only the
//! first sheet is read; `.csv` files go through the csv crate. In both cases
//! the first row is the header.

use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::ImportError;
use crate::util::date::serial_to_datetime;

/// Loaded spreadsheet: header columns plus non-empty data rows in file order.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub columns: Vec<String>,
    pub rows: Vec<SheetRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetRow {
    /// Visible row number: the header is row 1, the first data row is row 2.
    pub number: usize,
    cells: HashMap<String, String>,
}

impl SheetRow {
    pub fn new(number: usize, cells: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            number,
            cells: cells.into_iter().collect(),
        }
    }

    /// Trimmed cell value, `None` when the column is absent or the cell blank.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.trim().is_empty())
    }
}

pub fn read_sheet(path: &Path) -> Result<Sheet, ImportError> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        read_csv(path)
    } else {
        read_workbook(path)
    }
}

fn spreadsheet_error(path: &Path, message: impl ToString) -> ImportError {
    ImportError::Spreadsheet {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

/// `first_row` is the visible number of the first record.
fn build_sheet(
    columns: Vec<String>,
    first_row: usize,
    records: impl Iterator<Item = Vec<String>>,
) -> Sheet {
    let rows = records
        .enumerate()
        .map(|(idx, values)| {
            let cells = columns
                .iter()
                .cloned()
                .zip(values.into_iter().chain(std::iter::repeat(String::new())));
            // Keep the first occurrence when a header name repeats.
            let mut unique = HashMap::new();
            for (column, value) in cells {
                unique.entry(column).or_insert(value);
            }
            SheetRow::new(first_row + idx, unique)
        })
        .filter(|row| !row.is_blank())
        .collect();

    Sheet { columns, rows }
}

fn read_csv(path: &Path) -> Result<Sheet, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| spreadsheet_error(path, e))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| spreadsheet_error(path, e))?
        .iter()
        .map(normalize_header)
        .collect();

    let records = reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect::<Vec<_>>())
                .map_err(|e| spreadsheet_error(path, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(build_sheet(columns, 2, records.into_iter()))
}

fn read_workbook(path: &Path) -> Result<Sheet, ImportError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| spreadsheet_error(path, e))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| spreadsheet_error(path, "workbook has no sheets"))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| spreadsheet_error(path, format!("sheet '{sheet_name}': {e}")))?;

    // The range starts at the first used row, not necessarily row 1.
    let header_row = range.start().map_or(1, |(row, _)| row as usize + 1);
    let mut rows = range.rows();
    let columns: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .map(|cell| normalize_header(&cell_to_string(cell)))
            .collect(),
        None => return Ok(Sheet::default()),
    };

    let records: Vec<Vec<String>> = rows
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    Ok(build_sheet(columns, header_row + 1, records.into_iter()))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => serial_to_datetime(dt.as_f64())
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        _ => String::new(),
    }
}
