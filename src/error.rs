use std::path::PathBuf;

use thiserror::Error;

/// Fatal problems reading the sales table. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("workbook does not contain any worksheet")]
    NoWorksheet,

    #[error("worksheet '{0}' not found")]
    SheetNotFound(String),

    #[error("unsupported file type '{0}' (expected xlsx, xlsm, xlsb, xls, ods or csv)")]
    UnsupportedFormat(String),

    #[error("required column '{0}' is missing")]
    MissingColumn(String),

    #[error("row {row}: cannot parse '{value}' as a sale placement date")]
    InvalidDate { row: usize, value: String },
}

#[derive(Debug, Error)]
#[error("invalid cost {cost} for channel '{channel}': cost must be a non-negative number")]
pub struct CostError {
    pub channel: String,
    pub cost: f64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("at least one channel slot must be configured")]
    NoSlots,

    #[error("cost argument '{0}' must look like CHANNEL=AMOUNT")]
    CostArgument(String),

    #[error(transparent)]
    InvalidCost(#[from] CostError),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
