use thiserror::Error;

pub type PrepResult<T> = Result<T, PrepError>;

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Region '{0}' not found in workbook")]
    MissingRegion(String),

    #[error("Structural mismatch in region '{region}': {detail}")]
    StructuralMismatch { region: String, detail: String },

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl PrepError {
    /// Shorthand for a structural mismatch tied to a region
    pub fn mismatch(region: impl Into<String>, detail: impl Into<String>) -> Self {
        PrepError::StructuralMismatch {
            region: region.into(),
            detail: detail.into(),
        }
    }
}

impl From<arrow::error::ArrowError> for PrepError {
    fn from(e: arrow::error::ArrowError) -> Self {
        PrepError::Persistence(format!("Arrow: {}", e))
    }
}

impl From<parquet::errors::ParquetError> for PrepError {
    fn from(e: parquet::errors::ParquetError) -> Self {
        PrepError::Persistence(format!("Parquet: {}", e))
    }
}
