use crate::error::{PrepError, PrepResult};
use serde::{Deserialize, Serialize};
use std::fmt;

//==============================================================================
// Year Range
//==============================================================================

/// First year column retained from every region
pub const FIRST_YEAR: i64 = 1999;
/// Last year column retained from every region (inclusive)
pub const LAST_YEAR: i64 = 2021;
/// Number of retained year columns
pub const YEAR_COUNT: usize = (LAST_YEAR - FIRST_YEAR + 1) as usize;

/// All retained years, in column order
pub fn years() -> impl Iterator<Item = i64> {
    FIRST_YEAR..=LAST_YEAR
}

//==============================================================================
// Population Type
//==============================================================================

/// Population a counts/rates region pair describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulationType {
    /// Whole population
    Overall,
    /// Young adults aged 15-24
    YoungAdults,
}

impl PopulationType {
    /// Label written to the "Population Type" column
    pub fn label(&self) -> &'static str {
        match self {
            PopulationType::Overall => "Overall",
            PopulationType::YoungAdults => "Young Adults, 15-24 Years",
        }
    }
}

impl fmt::Display for PopulationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

//==============================================================================
// Attribute Keys
//==============================================================================

/// Identity of a configured counts/rates row.
///
/// A two-label key (e.g. drug type and sex) describes a general category and
/// lands in the "overall" table. Anything longer carries sub-attributes and
/// lands in the "specific" table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeKey {
    General([String; 2]),
    Specific(Vec<String>),
}

impl AttributeKey {
    /// Classify a configured label tuple. Returns None for fewer than two labels.
    pub fn classify(labels: &[String]) -> Option<Self> {
        match labels {
            [] | [_] => None,
            [a, b] => Some(AttributeKey::General([a.clone(), b.clone()])),
            _ => Some(AttributeKey::Specific(labels.to_vec())),
        }
    }

    pub fn labels(&self) -> &[String] {
        match self {
            AttributeKey::General(pair) => pair.as_slice(),
            AttributeKey::Specific(labels) => labels.as_slice(),
        }
    }

    pub fn is_general(&self) -> bool {
        matches!(self, AttributeKey::General(_))
    }
}

//==============================================================================
// Raw Tables
//==============================================================================

/// A retained cell as read from the sheet. Text is kept as-is and only
/// rejected when a configured index actually reads it.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Missing,
    Text(String),
}

impl From<Option<f64>> for CellValue {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) => CellValue::Number(v),
            None => CellValue::Missing,
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// One region of the workbook after trimming: labelled rows by year columns
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub region: String,
    /// Row labels from the identifier column
    pub labels: Vec<String>,
    /// Row-major cells, one entry per retained year
    cells: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Build a table; every row must carry exactly one cell per retained year
    pub fn new<C: Into<CellValue>>(
        region: impl Into<String>,
        labels: Vec<String>,
        cells: Vec<Vec<C>>,
    ) -> PrepResult<Self> {
        let region = region.into();
        let cells: Vec<Vec<CellValue>> = cells
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        if labels.len() != cells.len() {
            return Err(PrepError::mismatch(
                &region,
                format!("{} labels for {} rows", labels.len(), cells.len()),
            ));
        }
        if let Some((idx, row)) = cells.iter().enumerate().find(|(_, r)| r.len() != YEAR_COUNT) {
            return Err(PrepError::mismatch(
                &region,
                format!(
                    "row {} has {} year cells, expected {}",
                    idx,
                    row.len(),
                    YEAR_COUNT
                ),
            ));
        }
        Ok(Self {
            region,
            labels,
            cells,
        })
    }

    pub fn row_count(&self) -> usize {
        self.cells.len()
    }

    /// Keep only the first `rows` rows
    pub fn truncate(&mut self, rows: usize) {
        self.labels.truncate(rows);
        self.cells.truncate(rows);
    }

    /// Value at (row position, year). Empty cells are missing values; a
    /// non-numeric cell is a structural mismatch.
    pub fn cell(&self, row: usize, year: i64) -> PrepResult<Option<f64>> {
        if !(FIRST_YEAR..=LAST_YEAR).contains(&year) {
            return Err(PrepError::mismatch(
                &self.region,
                format!("year {} outside {}-{}", year, FIRST_YEAR, LAST_YEAR),
            ));
        }
        let cells = self.cells.get(row).ok_or_else(|| {
            PrepError::mismatch(
                &self.region,
                format!(
                    "row {} out of bounds (table has {} rows) at year {}",
                    row,
                    self.row_count(),
                    year
                ),
            )
        })?;
        match &cells[(year - FIRST_YEAR) as usize] {
            CellValue::Number(v) => Ok(Some(*v)),
            CellValue::Missing => Ok(None),
            CellValue::Text(text) => Err(PrepError::mismatch(
                &self.region,
                format!("non-numeric cell '{}' at row {}, year {}", text, row, year),
            )),
        }
    }
}

//==============================================================================
// Long-Format Records
//==============================================================================

/// Deaths and rate for one attribute key, year and population
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureRecord {
    pub attributes: Vec<String>,
    pub deaths: Option<f64>,
    pub rate: Option<f64>,
    pub year: i64,
    pub population: PopulationType,
}

/// Specific-category record with its share of the in-category maximum
#[derive(Debug, Clone, PartialEq)]
pub struct SpecificRecord {
    pub measure: MeasureRecord,
    /// Largest deaths value within (drug type, sex, year, population)
    pub in_category_max: Option<f64>,
    /// deaths / in_category_max * 100
    pub percent_of_category: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemographicRecord {
    pub attributes: Vec<String>,
    pub rate: Option<f64>,
    pub year: i64,
}

/// The three final tables, fully built in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub overall: Vec<MeasureRecord>,
    pub specific: Vec<SpecificRecord>,
    pub demographic: Vec<DemographicRecord>,
}
