//! Error types for wpcomb

use std::path::PathBuf;

use thiserror::Error;

/// wpcomb error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Table read/write error
    #[error("table error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An expected column is absent from an input table
    #[error("missing expected column `{column}` in {}", path.display())]
    MissingColumn { column: String, path: PathBuf },

    /// A required column holds null values
    #[error("null value in column `{column}` of {}", path.display())]
    NullValue { column: String, path: PathBuf },

    /// A histogram is absent from a histogram file
    #[error("histogram `{name}` not found in {}", path.display())]
    MissingHistogram { name: String, path: PathBuf },

    /// Signal and background histograms disagree on binning
    #[error("binning mismatch: {0}")]
    BinningMismatch(String),

    /// Invalid analysis configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Plot rendering error
    #[error("plot error: {0}")]
    Plot(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
