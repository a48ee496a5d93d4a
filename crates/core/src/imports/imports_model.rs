//! Import batch domain models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::field_mapping::MappingConfig;
use super::imports_errors::ImportError;
use super::statement_reader::StatementSource;
use crate::errors::{Error, ValidationError};
use crate::transactions::TransactionCandidate;

/// Lifecycle of an import batch.
///
/// `uploaded` → `mapped` → `committed` | `failed`. Re-mapping is allowed while
/// the batch is `uploaded` or `mapped`; a committed batch never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportBatchStatus {
    Uploaded,
    Mapped,
    Committed,
    Failed,
}

impl ImportBatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportBatchStatus::Uploaded => "uploaded",
            ImportBatchStatus::Mapped => "mapped",
            ImportBatchStatus::Committed => "committed",
            ImportBatchStatus::Failed => "failed",
        }
    }

    pub fn accepts_mapping(&self) -> bool {
        matches!(self, ImportBatchStatus::Uploaded | ImportBatchStatus::Mapped)
    }

    pub fn can_discard(&self) -> bool {
        !matches!(self, ImportBatchStatus::Committed)
    }
}

impl fmt::Display for ImportBatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportBatchStatus {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "uploaded" => Ok(ImportBatchStatus::Uploaded),
            "mapped" => Ok(ImportBatchStatus::Mapped),
            "committed" => Ok(ImportBatchStatus::Committed),
            "failed" => Ok(ImportBatchStatus::Failed),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown import batch status '{}'",
                other
            )))),
        }
    }
}

/// One cell of a raw row, keyed by its column header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCell {
    pub header: String,
    pub value: String,
}

/// A data row exactly as read from the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRow {
    /// 1-based line (delimited text) or row (spreadsheet) in the source file.
    pub row_number: usize,
    pub cells: Vec<RawCell>,
}

impl RawRow {
    pub fn new(row_number: usize, headers: &[String], values: Vec<String>) -> Self {
        let mut values = values.into_iter();
        let cells = headers
            .iter()
            .map(|header| RawCell {
                header: header.clone(),
                value: values.next().unwrap_or_default(),
            })
            .collect();
        Self { row_number, cells }
    }

    /// Value under `header`, first match wins.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|c| c.header == header)
            .map(|c| c.value.as_str())
    }

    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(|c| c.value.as_str())
    }
}

/// A row the commit step could not turn into a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowIssue {
    pub row_number: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<String>,
    pub reason: String,
}

impl RowIssue {
    pub fn missing(row_number: usize, field: &str) -> Self {
        Self {
            row_number,
            field: Some(field.to_string()),
            raw_value: None,
            reason: format!("Missing required field '{}'", field),
        }
    }
}

impl From<ImportError> for RowIssue {
    fn from(err: ImportError) -> Self {
        let reason = err.to_string();
        match err {
            ImportError::InvalidDate { row, raw, .. } => RowIssue {
                row_number: row,
                field: Some("date".to_string()),
                raw_value: Some(raw),
                reason,
            },
            ImportError::InvalidAmount {
                row, field, raw, ..
            } => RowIssue {
                row_number: row,
                field: Some(field),
                raw_value: Some(raw),
                reason,
            },
            _ => RowIssue {
                row_number: 0,
                field: None,
                raw_value: None,
                reason,
            },
        }
    }
}

/// One uploaded statement tracked from raw rows to committed transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    pub id: String,
    pub account_id: String,
    pub file_name: String,
    pub source: StatementSource,
    pub headers: Vec<String>,
    /// 1-based position of the detected header row.
    pub header_row_number: usize,
    pub mapping: Option<MappingConfig>,
    pub status: ImportBatchStatus,
    pub total_rows: usize,
    pub committed_count: usize,
    pub skipped_count: usize,
    pub duplicate_count: usize,
    pub flagged_count: usize,
    pub skipped_rows: Vec<RowIssue>,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ImportBatch {
    pub fn ensure_status(&self, allowed: &[ImportBatchStatus]) -> Result<(), ImportError> {
        if allowed.contains(&self.status) {
            return Ok(());
        }
        Err(ImportError::InvalidBatchStatus {
            status: self.status,
            expected: allowed
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(" or "),
        })
    }
}

/// Input for persisting a freshly uploaded statement.
#[derive(Debug, Clone)]
pub struct NewImportBatch {
    pub account_id: String,
    pub file_name: String,
    pub source: StatementSource,
    pub headers: Vec<String>,
    pub header_row_number: usize,
    pub rows: Vec<RawRow>,
}

/// Final numbers of a commit, written together with the new transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitCounts {
    pub committed: usize,
    pub skipped: usize,
    pub duplicate: usize,
    pub flagged: usize,
    pub skipped_rows: Vec<RowIssue>,
}

/// Returned by upload: the batch plus what the caller needs to map it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub batch: ImportBatch,
    pub sample_rows: Vec<RawRow>,
    pub suggested_mapping: Option<MappingConfig>,
}

/// Candidates and row issues produced by the current mapping, without
/// committing anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedPreview {
    pub batch_id: String,
    pub candidates: Vec<TransactionCandidate>,
    pub issues: Vec<RowIssue>,
}

/// Outcome of a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub batch: ImportBatch,
    /// Row numbers of duplicates, in file order.
    pub duplicate_rows: Vec<usize>,
    /// Row numbers committed with `needs_review` set.
    pub flagged_rows: Vec<usize>,
}
