//! Pipeline configuration loaded from YAML
//!
//! The configuration names every workbook region the pipeline reads, which
//! rows of each region carry which attribute tuple, and the column names of
//! the three output tables.

use crate::error::{PrepError, PrepResult};
use crate::types::{AttributeKey, PopulationType};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Columns following the attribute labels in "overall" and "specific":
/// deaths, rate, year, population type
pub const MEASURE_COLUMNS: usize = 4;
/// Columns following the attribute labels in "demographic": rate, year
pub const DEMOGRAPHIC_MEASURE_COLUMNS: usize = 2;
/// Derived columns appended to the "specific" table
pub const IN_CATEGORY_MAX_COLUMN: &str = "In-category Overall Deaths";
pub const PERCENT_COLUMN: &str = "Percent Opioid Deaths";

fn default_input() -> PathBuf {
    PathBuf::from("data/raw/Overdose_data_1999-2021 1.19.23.xlsx")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

fn default_header_rows() -> u32 {
    6
}

fn default_group_columns() -> Vec<String> {
    vec!["Drug Type".to_string(), "Sex".to_string()]
}

/// Immutable configuration for one pipeline run
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrepConfig {
    #[serde(default = "default_input")]
    pub input: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Sheet rows above the header row
    #[serde(default = "default_header_rows")]
    pub header_rows: u32,
    /// Attribute columns that, with year and population type, form the
    /// in-category grouping of the specific table
    #[serde(default = "default_group_columns")]
    pub group_columns: Vec<String>,
    pub populations: Vec<PopulationPlan>,
    /// Rate-only region reshaped into the demographic table
    pub demographic: String,
    pub overall_columns: Vec<String>,
    pub specific_columns: Vec<String>,
    pub demographic_columns: Vec<String>,
    pub regions: BTreeMap<String, RegionConfig>,
}

/// Counts and rates regions describing one population
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopulationPlan {
    pub population: PopulationType,
    pub counts: String,
    pub rates: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionConfig {
    /// Usable data rows below the header; anything after is footnotes
    pub valid_rows: usize,
    /// Attribute tuples in output order
    pub indices: Vec<RowIndex>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RowIndex {
    pub attributes: Vec<String>,
    /// Position among the region's data rows
    pub row: usize,
}

/// Load and validate a configuration file
pub fn load_config(path: &Path) -> PrepResult<PrepConfig> {
    let content = std::fs::read_to_string(path)?;
    PrepConfig::from_yaml_str(&content)
}

impl PrepConfig {
    /// Parse and validate configuration from YAML text
    pub fn from_yaml_str(content: &str) -> PrepResult<Self> {
        let config: PrepConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Look up a region, failing with a configuration error if undeclared
    pub fn region(&self, name: &str) -> PrepResult<&RegionConfig> {
        self.regions
            .get(name)
            .ok_or_else(|| PrepError::Config(format!("Region '{}' is not configured", name)))
    }

    /// Number of attribute columns in the specific table
    pub fn specific_attribute_count(&self) -> usize {
        self.specific_columns.len().saturating_sub(MEASURE_COLUMNS)
    }

    /// Positions of the group columns among the specific attribute labels
    pub fn group_positions(&self) -> PrepResult<Vec<usize>> {
        let attribute_columns = &self.specific_columns[..self.specific_attribute_count()];
        self.group_columns
            .iter()
            .map(|name| {
                attribute_columns
                    .iter()
                    .position(|c| c == name)
                    .ok_or_else(|| {
                        PrepError::Config(format!(
                            "Group column '{}' is not an attribute column of specific_columns {:?}",
                            name, attribute_columns
                        ))
                    })
            })
            .collect()
    }

    /// Every configured region: referenced ones in first-use order, then
    /// the rest by name. A configured sheet missing from the workbook fails
    /// the run even when nothing reads it.
    pub fn load_order(&self) -> Vec<&str> {
        let mut names = self.referenced_regions();
        let unreferenced: Vec<&str> = self
            .regions
            .keys()
            .map(String::as_str)
            .filter(|name| !names.contains(name))
            .collect();
        names.extend(unreferenced);
        names
    }

    /// Regions read by a population or the demographic table, in first-use order
    pub fn referenced_regions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let plans = self
            .populations
            .iter()
            .flat_map(|p| [p.counts.as_str(), p.rates.as_str()]);
        for name in plans.chain(std::iter::once(self.demographic.as_str())) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Check cross references and column widths
    pub fn validate(&self) -> PrepResult<()> {
        if self.populations.is_empty() {
            return Err(PrepError::Config(
                "At least one population must be configured".to_string(),
            ));
        }

        for name in self.referenced_regions() {
            self.region(name)?;
        }

        let overall_width = 2 + MEASURE_COLUMNS;
        if self.overall_columns.len() != overall_width {
            return Err(PrepError::Config(format!(
                "overall_columns has {} names, expected {}",
                self.overall_columns.len(),
                overall_width
            )));
        }

        let mut has_specific = false;
        for plan in &self.populations {
            let region = self.region(&plan.counts)?;
            for index in &region.indices {
                let key = AttributeKey::classify(&index.attributes).ok_or_else(|| {
                    PrepError::Config(format!(
                        "Region '{}' row {}: attribute tuple {:?} needs at least two labels",
                        plan.counts, index.row, index.attributes
                    ))
                })?;
                if key.is_general() {
                    continue;
                }
                has_specific = true;
                if key.labels().len() != self.specific_attribute_count() {
                    return Err(PrepError::Config(format!(
                        "Region '{}' row {}: {} attribute labels but specific_columns expects {}",
                        plan.counts,
                        index.row,
                        key.labels().len(),
                        self.specific_attribute_count()
                    )));
                }
            }
        }
        if has_specific {
            self.group_positions()?;
        }

        let demographic_attrs = self
            .demographic_columns
            .len()
            .saturating_sub(DEMOGRAPHIC_MEASURE_COLUMNS);
        for index in &self.region(&self.demographic)?.indices {
            if index.attributes.is_empty() || index.attributes.len() != demographic_attrs {
                return Err(PrepError::Config(format!(
                    "Region '{}' row {}: {} attribute labels but demographic_columns expects {}",
                    self.demographic,
                    index.row,
                    index.attributes.len(),
                    demographic_attrs
                )));
            }
        }

        Ok(())
    }
}
