use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::{
    DEFAULT_BALANCE_TOLERANCE, DEFAULT_ENTRY_NUMBER_PREFIX, DEFAULT_HEADER_SCAN_ROWS,
    DEFAULT_MAX_IMPORT_ROWS, DEFAULT_PREVIEW_ROWS,
};
use crate::errors::{Error, Result, ValidationError};

/// Tunables consumed by the import, journal and lock services.
///
/// Built once at startup (the server fills it from the environment) and
/// shared read-only by every service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSettings {
    /// Posting requires |debit - credit| to stay below this.
    pub balance_tolerance: Decimal,
    /// Sample rows returned with an upload preview.
    pub preview_rows: usize,
    /// Leading rows scored during header detection.
    pub header_scan_rows: usize,
    /// Upper bound on data rows per statement file.
    pub max_import_rows: usize,
    /// Prefix used for journal entry numbers.
    pub entry_number_prefix: String,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            balance_tolerance: Decimal::from_str(DEFAULT_BALANCE_TOLERANCE)
                .unwrap_or(Decimal::new(1, 2)),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            header_scan_rows: DEFAULT_HEADER_SCAN_ROWS,
            max_import_rows: DEFAULT_MAX_IMPORT_ROWS,
            entry_number_prefix: DEFAULT_ENTRY_NUMBER_PREFIX.to_string(),
        }
    }
}

impl LedgerSettings {
    /// Rejects settings that would make the services misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.balance_tolerance.is_sign_negative() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Balance tolerance cannot be negative".to_string(),
            )));
        }
        if self.preview_rows == 0 {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Preview row count must be at least 1".to_string(),
            )));
        }
        if self.header_scan_rows == 0 {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Header scan depth must be at least 1".to_string(),
            )));
        }
        if self.max_import_rows == 0 {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Maximum import rows must be at least 1".to_string(),
            )));
        }
        if self.entry_number_prefix.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "entryNumberPrefix".to_string(),
            )));
        }
        Ok(())
    }
}
