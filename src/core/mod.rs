//! Reshaping core: extraction, in-category aggregation, pipeline

pub mod aggregate;
pub mod extract;
pub mod pipeline;

pub use aggregate::attach_category_share;
pub use extract::{deaths_and_rate, rates_only, Extraction};
pub use pipeline::{Pipeline, RunSummary};
