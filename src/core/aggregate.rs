//! In-category maximum and percentage for the specific table

use crate::types::{MeasureRecord, PopulationType, SpecificRecord};
use std::collections::HashMap;

type GroupKey = (Vec<String>, i64, PopulationType);

fn group_key(record: &MeasureRecord, group_positions: &[usize]) -> GroupKey {
    let labels = group_positions
        .iter()
        .filter_map(|&p| record.attributes.get(p).cloned())
        .collect();
    (labels, record.year, record.population)
}

/// Attach the group maximum of deaths and each record's share of it.
///
/// Records are grouped by the attribute labels at `group_positions` plus year
/// and population type. Missing deaths are skipped when taking the maximum.
/// A zero maximum is not guarded against.
pub fn attach_category_share(
    records: Vec<MeasureRecord>,
    group_positions: &[usize],
) -> Vec<SpecificRecord> {
    let mut maxima: HashMap<GroupKey, Option<f64>> = HashMap::new();
    for record in &records {
        let entry = maxima
            .entry(group_key(record, group_positions))
            .or_insert(None);
        if let Some(deaths) = record.deaths {
            *entry = Some(entry.map_or(deaths, |m| m.max(deaths)));
        }
    }

    records
        .into_iter()
        .map(|measure| {
            let in_category_max = maxima
                .get(&group_key(&measure, group_positions))
                .copied()
                .flatten();
            let percent_of_category = match (measure.deaths, in_category_max) {
                (Some(deaths), Some(max)) => Some(deaths / max * 100.0),
                _ => None,
            };
            SpecificRecord {
                measure,
                in_category_max,
                percent_of_category,
            }
        })
        .collect()
}
