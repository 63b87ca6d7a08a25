use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaturaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Unsupported file format: {0} (expected .xls, .xlsx or .csv)")]
    UnsupportedFormat(String),

    #[error("Could not read file: {0}")]
    UnparsableFile(String),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("No date could be parsed (expected DD/MM/YYYY, YYYY-MM-DD, MM/DD/YYYY or DD-MM-YYYY)")]
    DateFormat,

    #[error("Invalid month: {0} (expected YYYY-MM)")]
    InvalidMonth(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, FaturaError>;
