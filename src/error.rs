use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source unavailable: {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Required column '{column}' is missing from {source_name}")]
    SchemaMissing { source_name: String, column: String },

    #[error("Join key column '{0}' is missing from the merged data")]
    JoinKeyMissing(String),

    #[error("Column '{0}' is not available in the data")]
    ColumnUnavailable(String),

    #[error("Unknown view: {0}")]
    UnknownView(String),

    #[error("Chart error: {0}")]
    Chart(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
