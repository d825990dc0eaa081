//! Pipeline entry point: load regions, reshape, derive, persist

use crate::config::PrepConfig;
use crate::core::aggregate::attach_category_share;
use crate::core::extract::{deaths_and_rate, rates_only};
use crate::error::{PrepError, PrepResult};
use crate::excel::{RegionSource, WorkbookSource};
use crate::types::{Dataset, RawTable};
use crate::writer;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Outcome of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub input: PathBuf,
    pub overall_rows: usize,
    pub specific_rows: usize,
    pub demographic_rows: usize,
    /// Files committed to disk; empty for a dry run
    pub written: Vec<PathBuf>,
}

impl RunSummary {
    fn new(input: &Path, dataset: &Dataset) -> Self {
        Self {
            input: input.to_path_buf(),
            overall_rows: dataset.overall.len(),
            specific_rows: dataset.specific.len(),
            demographic_rows: dataset.demographic.len(),
            written: Vec::new(),
        }
    }
}

/// One batch pass over the workbook, driven by an immutable configuration
pub struct Pipeline {
    config: PrepConfig,
}

impl Pipeline {
    pub fn new(config: PrepConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PrepConfig {
        &self.config
    }

    /// Build the three tables in memory without touching the filesystem
    pub fn build<S: RegionSource>(&self, source: &mut S) -> PrepResult<Dataset> {
        let config = &self.config;

        let mut tables: HashMap<&str, RawTable> = HashMap::new();
        for name in config.load_order() {
            let table = source.load(name, config.region(name)?)?;
            tables.insert(name, table);
        }

        let mut dataset = Dataset::default();
        let mut specific = Vec::new();

        for plan in &config.populations {
            let counts = loaded(&tables, &plan.counts)?;
            let rates = loaded(&tables, &plan.rates)?;
            let indices = &config.region(&plan.counts)?.indices;

            let extraction = deaths_and_rate(counts, rates, indices, plan.population)?;
            info!(
                population = plan.population.label(),
                overall = extraction.overall.len(),
                specific = extraction.specific.len(),
                "extracted counts and rates"
            );
            dataset.overall.extend(extraction.overall);
            specific.extend(extraction.specific);
        }

        if !specific.is_empty() {
            let positions = config.group_positions()?;
            dataset.specific = attach_category_share(specific, &positions);
        }

        let demographic = loaded(&tables, &config.demographic)?;
        dataset.demographic = rates_only(demographic, &config.region(&config.demographic)?.indices)?;

        info!(
            overall = dataset.overall.len(),
            specific = dataset.specific.len(),
            demographic = dataset.demographic.len(),
            "built tables"
        );
        Ok(dataset)
    }

    /// Build from the workbook at `input` without writing anything
    pub fn dry_run(&self, input: &Path) -> PrepResult<RunSummary> {
        let mut source = WorkbookSource::open(input, self.config.header_rows)?;
        let dataset = self.build(&mut source)?;
        Ok(RunSummary::new(input, &dataset))
    }

    /// Build from the workbook at `input` and write all three tables into
    /// `output_dir`. Nothing is written unless every table was built.
    pub fn run(&self, input: &Path, output_dir: &Path) -> PrepResult<RunSummary> {
        let mut source = WorkbookSource::open(input, self.config.header_rows)?;
        let dataset = self.build(&mut source)?;

        let mut summary = RunSummary::new(input, &dataset);
        summary.written = writer::write_dataset(&dataset, &self.config, output_dir)?;
        Ok(summary)
    }
}

fn loaded<'a>(tables: &'a HashMap<&str, RawTable>, name: &str) -> PrepResult<&'a RawTable> {
    tables
        .get(name)
        .ok_or_else(|| PrepError::MissingRegion(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::MemorySource;
    use crate::types::{PopulationType, YEAR_COUNT};

    const CONFIG: &str = r#"
populations:
  - population: overall
    counts: "Number"
    rates: "Rate"
  - population: young_adults
    counts: "Number YA"
    rates: "Rate YA"
demographic: "Demo"
overall_columns: ["Drug Type", "Sex", "Deaths", "Rate", "Year", "Population Type"]
specific_columns: ["Drug Type", "Sex", "Opioid", "Deaths", "Rate", "Year", "Population Type"]
demographic_columns: ["Race", "Rate", "Year"]
regions:
  "Number":
    valid_rows: 2
    indices:
      - { attributes: ["Any Drug", "Total"], row: 0 }
      - { attributes: ["Any Drug", "Total", "Heroin"], row: 1 }
  "Rate": { valid_rows: 2, indices: [] }
  "Number YA":
    valid_rows: 2
    indices:
      - { attributes: ["Any Drug", "Total"], row: 0 }
      - { attributes: ["Any Drug", "Total", "Heroin"], row: 1 }
  "Rate YA": { valid_rows: 2, indices: [] }
  "Demo":
    valid_rows: 1
    indices:
      - { attributes: ["White"], row: 0 }
"#;

    fn flat(region: &str, values: &[f64]) -> RawTable {
        let labels = values.iter().map(|v| format!("row {}", v)).collect();
        let cells: Vec<Vec<Option<f64>>> =
            values.iter().map(|v| vec![Some(*v); YEAR_COUNT]).collect();
        RawTable::new(region, labels, cells).unwrap()
    }

    fn source() -> MemorySource {
        MemorySource::new()
            .with(flat("Number", &[100.0, 40.0]))
            .with(flat("Rate", &[10.0, 4.0]))
            .with(flat("Number YA", &[20.0, 5.0]))
            .with(flat("Rate YA", &[2.0, 0.5]))
            .with(flat("Demo", &[7.5]))
    }

    #[test]
    fn test_build_row_counts() {
        let pipeline = Pipeline::new(PrepConfig::from_yaml_str(CONFIG).unwrap());
        let dataset = pipeline.build(&mut source()).unwrap();

        assert_eq!(dataset.overall.len(), 2 * YEAR_COUNT);
        assert_eq!(dataset.specific.len(), 2 * YEAR_COUNT);
        assert_eq!(dataset.demographic.len(), YEAR_COUNT);
    }

    #[test]
    fn test_populations_concatenated_in_order() {
        let pipeline = Pipeline::new(PrepConfig::from_yaml_str(CONFIG).unwrap());
        let dataset = pipeline.build(&mut source()).unwrap();

        assert!(dataset.overall[..YEAR_COUNT]
            .iter()
            .all(|r| r.population == PopulationType::Overall));
        assert!(dataset.overall[YEAR_COUNT..]
            .iter()
            .all(|r| r.population == PopulationType::YoungAdults));
    }

    #[test]
    fn test_specific_share_uses_population_groups() {
        let pipeline = Pipeline::new(PrepConfig::from_yaml_str(CONFIG).unwrap());
        let dataset = pipeline.build(&mut source()).unwrap();

        // Only the heroin row sits in each group, so it is its own maximum
        assert!(dataset
            .specific
            .iter()
            .all(|r| r.percent_of_category == Some(100.0)));
        assert_eq!(dataset.specific[0].in_category_max, Some(40.0));
        assert_eq!(dataset.specific[YEAR_COUNT].in_category_max, Some(5.0));
    }

    #[test]
    fn test_missing_region_aborts() {
        let pipeline = Pipeline::new(PrepConfig::from_yaml_str(CONFIG).unwrap());
        let mut partial = MemorySource::new().with(flat("Number", &[1.0, 2.0]));

        let err = pipeline.build(&mut partial).unwrap_err();
        assert!(matches!(err, PrepError::MissingRegion(name) if name == "Rate"));
    }

    #[test]
    fn test_unreferenced_region_must_exist() {
        let yaml = CONFIG.replace(
            "  \"Demo\":\n",
            "  \"Archive\": { valid_rows: 1, indices: [] }\n  \"Demo\":\n",
        );
        let pipeline = Pipeline::new(PrepConfig::from_yaml_str(&yaml).unwrap());

        let err = pipeline.build(&mut source()).unwrap_err();
        assert!(matches!(err, PrepError::MissingRegion(name) if name == "Archive"));

        let mut with_archive = source().with(flat("Archive", &[1.0]));
        assert!(pipeline.build(&mut with_archive).is_ok());
    }

    #[test]
    fn test_rate_table_truncated_below_index() {
        let yaml = CONFIG.replace(
            "\"Rate\": { valid_rows: 2, indices: [] }",
            "\"Rate\": { valid_rows: 1, indices: [] }",
        );
        let pipeline = Pipeline::new(PrepConfig::from_yaml_str(&yaml).unwrap());

        let err = pipeline.build(&mut source()).unwrap_err();
        assert!(matches!(err, PrepError::StructuralMismatch { region, .. } if region == "Rate"));
    }
}
