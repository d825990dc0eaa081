//! Shared fixtures: synthetic workbooks and Parquet readers

#![allow(dead_code)]

use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rust_xlsxwriter::Workbook;
use std::fs::File;
use std::path::Path;

pub const FIRST_YEAR: i64 = 1999;
pub const LAST_YEAR: i64 = 2021;

/// A data row: label and one value per year 1999..=2021
pub struct SheetRow {
    pub label: String,
    pub values: Vec<f64>,
    /// Written as text in every year column instead of `values`
    pub marker: Option<String>,
}

impl SheetRow {
    pub fn from_fn(label: &str, f: impl Fn(i64) -> f64) -> Self {
        Self {
            label: label.to_string(),
            values: (FIRST_YEAR..=LAST_YEAR).map(f).collect(),
            marker: None,
        }
    }

    /// Row whose year cells all hold a text marker such as "*"
    pub fn marked(label: &str, marker: &str) -> Self {
        Self {
            label: label.to_string(),
            values: Vec::new(),
            marker: Some(marker.to_string()),
        }
    }
}

/// Write a workbook laid out like the published dataset: six preamble rows,
/// a header row of years starting in column C, data rows, then a footnote
pub fn write_workbook(path: &Path, sheets: &[(&str, Vec<SheetRow>)]) {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(*name).unwrap();
        sheet.write_string(0, 0, *name).unwrap();
        sheet.write_string(2, 0, "Deaths per year").unwrap();
        for (i, year) in (FIRST_YEAR..=LAST_YEAR).enumerate() {
            sheet.write_number(6, 2 + i as u16, year as f64).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            let sheet_row = 7 + r as u32;
            sheet.write_string(sheet_row, 1, &row.label).unwrap();
            if let Some(marker) = &row.marker {
                for i in 0..(LAST_YEAR - FIRST_YEAR + 1) as u16 {
                    sheet.write_string(sheet_row, 2 + i, marker).unwrap();
                }
            }
            for (i, value) in row.values.iter().enumerate() {
                sheet.write_number(sheet_row, 2 + i as u16, *value).unwrap();
            }
        }
        let footnote_row = 7 + rows.len() as u32 + 1;
        sheet
            .write_string(footnote_row, 1, "Source: CDC WONDER")
            .unwrap();
        sheet
            .write_string(footnote_row, 2, "see notes")
            .unwrap();
    }
    workbook.save(path).unwrap();
}

/// Deterministic counts: decreasing with row, increasing with year
pub fn count_value(base: f64, row: usize, year: i64) -> f64 {
    base - row as f64 * 10.0 + (year - FIRST_YEAR) as f64
}

pub fn rate_value(base: f64, row: usize, year: i64) -> f64 {
    count_value(base, row, year) / 100.0
}

/// Labels of the five-row counts/rates layout used by the fixtures
pub const FIXTURE_LABELS: [&str; 5] = [
    "Any Drug",
    "Male",
    "Cocaine",
    "Cocaine with opioid",
    "Cocaine without opioid",
];

pub fn counts_rows(base: f64) -> Vec<SheetRow> {
    FIXTURE_LABELS
        .iter()
        .enumerate()
        .map(|(r, label)| SheetRow::from_fn(label, |y| count_value(base, r, y)))
        .collect()
}

pub fn rate_rows(base: f64) -> Vec<SheetRow> {
    FIXTURE_LABELS
        .iter()
        .enumerate()
        .map(|(r, label)| SheetRow::from_fn(label, |y| rate_value(base, r, y)))
        .collect()
}

pub fn demographic_rows() -> Vec<SheetRow> {
    vec![
        SheetRow::from_fn("White Male", |y| 20.0 + (y - FIRST_YEAR) as f64 * 0.5),
        SheetRow::from_fn("Black Male", |y| 15.0 + (y - FIRST_YEAR) as f64 * 0.25),
    ]
}

pub const OVERALL_BASE: f64 = 1000.0;
pub const YOUNG_ADULT_BASE: f64 = 500.0;

/// Workbook with all five regions the fixture config references
pub fn write_full_workbook(path: &Path) {
    write_workbook(
        path,
        &[
            ("Number Drug OD Deaths", counts_rows(OVERALL_BASE)),
            ("Rate Drug OD Deaths", rate_rows(OVERALL_BASE)),
            ("Number Drug OD, 15-24 Years", counts_rows(YOUNG_ADULT_BASE)),
            ("Rate Drug OD, 15-24 Years", rate_rows(YOUNG_ADULT_BASE)),
            ("Rate OD by Demographic", demographic_rows()),
        ],
    );
}

pub const FIXTURE_CONFIG: &str = r#"
populations:
  - population: overall
    counts: "Number Drug OD Deaths"
    rates: "Rate Drug OD Deaths"
  - population: young_adults
    counts: "Number Drug OD, 15-24 Years"
    rates: "Rate Drug OD, 15-24 Years"
demographic: "Rate OD by Demographic"
overall_columns: ["Drug Type", "Sex", "Deaths", "Rate", "Year", "Population Type"]
specific_columns: ["Drug Type", "Sex", "Opioid Involvement", "Deaths", "Rate", "Year", "Population Type"]
demographic_columns: ["Race", "Sex", "Rate", "Year"]
regions:
  "Number Drug OD Deaths":
    valid_rows: 5
    indices:
      - { attributes: ["Any Drug", "Total"], row: 0 }
      - { attributes: ["Any Drug", "Male"], row: 1 }
      - { attributes: ["Cocaine", "Total", "Overall"], row: 2 }
      - { attributes: ["Cocaine", "Total", "With Any Opioid"], row: 3 }
      - { attributes: ["Cocaine", "Total", "Without Any Opioid"], row: 4 }
  "Rate Drug OD Deaths":
    valid_rows: 5
    indices: []
  "Number Drug OD, 15-24 Years":
    valid_rows: 5
    indices:
      - { attributes: ["Any Drug", "Total"], row: 0 }
      - { attributes: ["Any Drug", "Male"], row: 1 }
      - { attributes: ["Cocaine", "Total", "Overall"], row: 2 }
      - { attributes: ["Cocaine", "Total", "With Any Opioid"], row: 3 }
      - { attributes: ["Cocaine", "Total", "Without Any Opioid"], row: 4 }
  "Rate Drug OD, 15-24 Years":
    valid_rows: 5
    indices: []
  "Rate OD by Demographic":
    valid_rows: 2
    indices:
      - { attributes: ["White", "Male"], row: 0 }
      - { attributes: ["Black", "Male"], row: 1 }
"#;

pub fn read_parquet(path: &Path) -> Vec<RecordBatch> {
    ParquetRecordBatchReaderBuilder::try_new(File::open(path).unwrap())
        .unwrap()
        .build()
        .unwrap()
        .map(|b| b.unwrap())
        .collect()
}

pub fn strings(batches: &[RecordBatch], name: &str) -> Vec<String> {
    batches
        .iter()
        .flat_map(|b| {
            let col = b
                .column_by_name(name)
                .unwrap_or_else(|| panic!("missing column {}", name));
            let arr = col.as_any().downcast_ref::<StringArray>().unwrap();
            (0..arr.len())
                .map(|i| arr.value(i).to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn floats(batches: &[RecordBatch], name: &str) -> Vec<Option<f64>> {
    batches
        .iter()
        .flat_map(|b| {
            let col = b
                .column_by_name(name)
                .unwrap_or_else(|| panic!("missing column {}", name));
            let arr = col.as_any().downcast_ref::<Float64Array>().unwrap();
            (0..arr.len())
                .map(|i| if arr.is_null(i) { None } else { Some(arr.value(i)) })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn ints(batches: &[RecordBatch], name: &str) -> Vec<i64> {
    batches
        .iter()
        .flat_map(|b| {
            let col = b
                .column_by_name(name)
                .unwrap_or_else(|| panic!("missing column {}", name));
            let arr = col.as_any().downcast_ref::<Int64Array>().unwrap();
            (0..arr.len()).map(|i| arr.value(i)).collect::<Vec<_>>()
        })
        .collect()
}
