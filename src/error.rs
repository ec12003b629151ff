use thiserror::Error;

use crate::task::ParseError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid row at line {line}: {reason}")]
    InvalidRow { line: u64, reason: ParseError },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("Feature name must not be empty")]
    EmptyFeature,
}
