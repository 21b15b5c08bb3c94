use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type SalesUpdateResult<T> = Result<T, SalesUpdateError>;

#[derive(Error, Debug)]
pub enum SalesUpdateError {
    #[error("No file matching '{pattern}' found in {}", dir.display())]
    FileNotFound { dir: PathBuf, pattern: String },

    #[error("Sheet '{0}' not found in the workbook")]
    SheetNotFound(String),

    #[error("Column '{column}' not found in {source_name}")]
    MissingColumn { column: String, source_name: String },

    #[error("Invalid column reference '{0}'")]
    InvalidColumn(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Layout configuration error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(String),
}

impl SalesUpdateError {
    pub fn missing_column(column: impl Into<String>, source_name: impl fmt::Display) -> Self {
        SalesUpdateError::MissingColumn {
            column: column.into(),
            source_name: source_name.to_string(),
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for SalesUpdateError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        SalesUpdateError::Template(e.to_string())
    }
}

impl From<calamine::XlsxError> for SalesUpdateError {
    fn from(e: calamine::XlsxError) -> Self {
        SalesUpdateError::Workbook(e.to_string())
    }
}

impl From<serde_yaml::Error> for SalesUpdateError {
    fn from(e: serde_yaml::Error) -> Self {
        SalesUpdateError::Config(e.to_string())
    }
}

/// What a raw cell was expected to hold when coercion failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionKind {
    Customer,
    Currency,
    Date,
}

impl fmt::Display for CoercionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoercionKind::Customer => "customer number",
            CoercionKind::Currency => "currency amount",
            CoercionKind::Date => "date",
        };
        f.write_str(name)
    }
}

/// A single cell that could not be coerced. Never escalated: the loader turns
/// these into row drops and per-column counts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{raw}' is not a valid {kind}")]
pub struct CoercionError {
    pub kind: CoercionKind,
    pub raw: String,
}

impl CoercionError {
    pub fn new(kind: CoercionKind, raw: &str) -> Self {
        Self {
            kind,
            raw: raw.to_string(),
        }
    }
}
