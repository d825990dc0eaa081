//! Workbook access for the table loader
//!
//! - `WorkbookSource`: calamine-backed reader for the .xlsx input
//! - `MemorySource`: pre-built tables, for synthetic datasets and tests

mod importer;

pub use importer::{table_from_range, WorkbookSource};

use crate::config::RegionConfig;
use crate::error::{PrepError, PrepResult};
use crate::types::RawTable;
use std::collections::HashMap;

/// Something that can produce the trimmed table of a named region
pub trait RegionSource {
    /// Load `name`, keeping at most `region.valid_rows` data rows.
    /// Fails with `PrepError::MissingRegion` if the region does not exist.
    fn load(&mut self, name: &str, region: &RegionConfig) -> PrepResult<RawTable>;
}

/// Region source over tables already held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<String, RawTable>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: RawTable) {
        self.tables.insert(table.region.clone(), table);
    }

    pub fn with(mut self, table: RawTable) -> Self {
        self.insert(table);
        self
    }
}

impl RegionSource for MemorySource {
    fn load(&mut self, name: &str, region: &RegionConfig) -> PrepResult<RawTable> {
        let mut table = self
            .tables
            .get(name)
            .cloned()
            .ok_or_else(|| PrepError::MissingRegion(name.to_string()))?;
        table.truncate(region.valid_rows);
        Ok(table)
    }
}
