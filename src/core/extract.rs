//! Long-format record extraction from row-aligned raw tables

use crate::config::RowIndex;
use crate::error::{PrepError, PrepResult};
use crate::types::{
    years, AttributeKey, DemographicRecord, MeasureRecord, PopulationType, RawTable,
};

/// Records extracted from one counts/rates region pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Two-label (general category) records
    pub overall: Vec<MeasureRecord>,
    /// Records carrying sub-attributes
    pub specific: Vec<MeasureRecord>,
}

/// Extract deaths and rates for every configured key and year.
///
/// `counts` and `rates` are row-aligned: the row position configured for the
/// counts region is read from both tables. Output is ordered year-major, then
/// by configured index order.
pub fn deaths_and_rate(
    counts: &RawTable,
    rates: &RawTable,
    indices: &[RowIndex],
    population: PopulationType,
) -> PrepResult<Extraction> {
    let keys = classify_indices(&counts.region, indices)?;
    let mut extraction = Extraction::default();

    for year in years() {
        for (key, row) in &keys {
            let record = MeasureRecord {
                attributes: key.labels().to_vec(),
                deaths: counts.cell(*row, year)?,
                rate: rates.cell(*row, year)?,
                year,
                population,
            };
            match key {
                AttributeKey::General(_) => extraction.overall.push(record),
                AttributeKey::Specific(_) => extraction.specific.push(record),
            }
        }
    }

    Ok(extraction)
}

/// Extract rates only, without routing; used for the demographic region
pub fn rates_only(rates: &RawTable, indices: &[RowIndex]) -> PrepResult<Vec<DemographicRecord>> {
    let mut records = Vec::with_capacity(indices.len() * crate::types::YEAR_COUNT);
    for year in years() {
        for index in indices {
            records.push(DemographicRecord {
                attributes: index.attributes.clone(),
                rate: rates.cell(index.row, year)?,
                year,
            });
        }
    }
    Ok(records)
}

fn classify_indices(region: &str, indices: &[RowIndex]) -> PrepResult<Vec<(AttributeKey, usize)>> {
    indices
        .iter()
        .map(|index| {
            AttributeKey::classify(&index.attributes)
                .map(|key| (key, index.row))
                .ok_or_else(|| {
                    PrepError::Config(format!(
                        "Region '{}' row {}: attribute tuple {:?} needs at least two labels",
                        region, index.row, index.attributes
                    ))
                })
        })
        .collect()
}
