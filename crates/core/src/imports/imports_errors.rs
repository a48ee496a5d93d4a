//! Statement import error types.

use thiserror::Error;

use super::imports_model::ImportBatchStatus;

/// Errors raised while reading, mapping and committing a statement.
///
/// Batch-fatal variants (`UnreadableFile`, `EmptyFile`, `IncompleteMapping`)
/// stop the step outright. `InvalidDate` and `InvalidAmount` describe a single
/// row; the commit step records them as skipped rows instead of aborting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error("Unreadable file: {0}")]
    UnreadableFile(String),

    #[error("File has no data rows below the detected header")]
    EmptyFile,

    #[error("Incomplete mapping: {0}")]
    IncompleteMapping(String),

    #[error("Row {row}: invalid date '{raw}': {reason}")]
    InvalidDate {
        row: usize,
        raw: String,
        reason: String,
    },

    #[error("Row {row}: invalid {field} '{raw}': {reason}")]
    InvalidAmount {
        row: usize,
        field: String,
        raw: String,
        reason: String,
    },

    #[error("Import failed, no transactions were saved: {0}")]
    ImportFailed(String),

    #[error("Import batch is {status}; expected {expected}")]
    InvalidBatchStatus {
        status: ImportBatchStatus,
        expected: String,
    },

    #[error("File has more than {limit} data rows")]
    TooManyRows { limit: usize },

    #[error("Account '{0}' cannot receive statement imports")]
    AccountNotImportable(String),
}
