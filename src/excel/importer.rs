//! Workbook region loader - Excel (.xlsx) sheet → RawTable

use crate::config::RegionConfig;
use crate::error::{PrepError, PrepResult};
use crate::excel::RegionSource;
use crate::types::{years, CellValue, RawTable, FIRST_YEAR, LAST_YEAR};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Sheet column holding the row labels; column 0 is an unused identifier
const LABEL_COLUMN: u32 = 1;

/// Region source backed by an .xlsx workbook on disk
pub struct WorkbookSource {
    path: PathBuf,
    workbook: Xlsx<BufReader<File>>,
    header_rows: u32,
}

impl WorkbookSource {
    /// Open a workbook; `header_rows` sheet rows sit above each header row
    pub fn open<P: AsRef<Path>>(path: P, header_rows: u32) -> PrepResult<Self> {
        let path = path.as_ref().to_path_buf();
        let workbook: Xlsx<_> = open_workbook(&path).map_err(|e| {
            PrepError::Workbook(format!("Failed to open '{}': {}", path.display(), e))
        })?;
        Ok(Self {
            path,
            workbook,
            header_rows,
        })
    }
}

impl RegionSource for WorkbookSource {
    fn load(&mut self, name: &str, region: &RegionConfig) -> PrepResult<RawTable> {
        if !self.workbook.sheet_names().iter().any(|s| s == name) {
            return Err(PrepError::MissingRegion(name.to_string()));
        }

        let range = self.workbook.worksheet_range(name).map_err(|e| {
            PrepError::Workbook(format!("Failed to read sheet '{}': {}", name, e))
        })?;

        let table = table_from_range(name, &range, self.header_rows, region.valid_rows)?;
        tracing::debug!(
            workbook = %self.path.display(),
            region = name,
            rows = table.row_count(),
            "loaded region {}-{}",
            FIRST_YEAR,
            LAST_YEAR
        );
        Ok(table)
    }
}

/// Trim a sheet range into a RawTable.
///
/// Coordinates are absolute sheet positions, so a sheet whose used range does
/// not start at A1 still lines up with the fixed header offset. The header row
/// sits directly below `header_rows`; data rows follow it and only the first
/// `valid_rows` of them are kept.
pub fn table_from_range(
    name: &str,
    range: &Range<Data>,
    header_rows: u32,
    valid_rows: usize,
) -> PrepResult<RawTable> {
    let (end_row, end_col) = range
        .end()
        .ok_or_else(|| PrepError::mismatch(name, "sheet is empty"))?;

    let header_row = header_rows;
    let year_columns = locate_year_columns(name, range, header_row, end_col)?;

    let available = end_row.saturating_sub(header_row) as usize;
    let row_count = available.min(valid_rows);

    let mut labels = Vec::with_capacity(row_count);
    let mut cells = Vec::with_capacity(row_count);

    for offset in 0..row_count {
        let sheet_row = header_row + 1 + offset as u32;

        let label = range
            .get_value((sheet_row, LABEL_COLUMN))
            .map(|cell| cell.to_string())
            .unwrap_or_default();
        labels.push(label);

        let row: Vec<CellValue> = year_columns
            .iter()
            .map(|col| {
                range
                    .get_value((sheet_row, *col))
                    .map_or(CellValue::Missing, cell_value)
            })
            .collect();
        cells.push(row);
    }

    RawTable::new(name, labels, cells)
}

/// Map every retained year to its sheet column, in year order
fn locate_year_columns(
    name: &str,
    range: &Range<Data>,
    header_row: u32,
    end_col: u32,
) -> PrepResult<Vec<u32>> {
    let mut by_year: HashMap<i64, u32> = HashMap::new();
    for col in 0..=end_col {
        let Some(year) = range.get_value((header_row, col)).and_then(header_year) else {
            continue;
        };
        by_year.entry(year).or_insert(col);
    }

    years()
        .map(|year| {
            by_year.get(&year).copied().ok_or_else(|| {
                PrepError::mismatch(
                    name,
                    format!("no column for year {} in header row {}", year, header_row + 1),
                )
            })
        })
        .collect()
}

/// Interpret a header cell as a year
fn header_year(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(i) => Some(*i),
        Data::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Retained data cell. Empty cells are missing values; text that does not
/// parse as a number is kept verbatim.
fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Empty => CellValue::Missing,
        Data::String(s) if s.trim().is_empty() => CellValue::Missing,
        Data::String(s) => s
            .trim()
            .parse()
            .map(CellValue::Number)
            .unwrap_or_else(|_| CellValue::Text(s.clone())),
        other => CellValue::Text(other.to_string()),
    }
}
