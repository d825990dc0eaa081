//! Overdose prep - workbook to long-format Parquet reshaping
//!
//! This library reads the fixed-layout overdose mortality workbook
//! (1999-2021), extracts the rows named in a YAML configuration and reshapes
//! them into three long-format tables.
//!
//! # Features
//!
//! - Configuration-driven row → attribute tuple mapping
//! - General vs specific categories as an explicit `AttributeKey`
//! - In-category maximum and percentage for the specific table
//! - All-or-nothing Parquet output
//!
//! # Example
//!
//! ```no_run
//! use overdose_prep::config::load_config;
//! use overdose_prep::core::Pipeline;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config/overdose.yaml"))?;
//! let input = config.input.clone();
//! let output_dir = config.output_dir.clone();
//!
//! let summary = Pipeline::new(config).run(&input, &output_dir)?;
//! println!("Overall rows: {}", summary.overall_rows);
//! # Ok::<(), overdose_prep::error::PrepError>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod types;
pub mod writer;

// Re-export commonly used types
pub use self::config::PrepConfig;
pub use self::core::{Pipeline, RunSummary};
pub use error::{PrepError, PrepResult};
pub use types::{AttributeKey, CellValue, Dataset, PopulationType, RawTable};
