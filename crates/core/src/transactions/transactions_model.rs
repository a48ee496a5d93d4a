//! Canonical transaction models.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result, ValidationError};
use crate::imports::RawRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Money into the account.
    Credit,
    /// Money out of the account.
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit => "credit",
            TransactionType::Debit => "debit",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "credit" => Ok(TransactionType::Credit),
            "debit" => Ok(TransactionType::Debit),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown transaction type '{}'",
                other
            )))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    Pending,
    Reconciled,
    Cancelled,
}

impl ReconciliationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationStatus::Pending => "pending",
            ReconciliationStatus::Reconciled => "reconciled",
            ReconciliationStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReconciliationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ReconciliationStatus::Pending),
            "reconciled" => Ok(ReconciliationStatus::Reconciled),
            "cancelled" => Ok(ReconciliationStatus::Cancelled),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown reconciliation status '{}'",
                other
            )))),
        }
    }
}

/// Signed amount and direction from a withdrawal/deposit pair.
///
/// Exactly one side must be positive; a zero side counts as absent.
/// The signed amount is `deposit - withdrawal`.
pub fn derive_amount(
    withdrawal: Option<Decimal>,
    deposit: Option<Decimal>,
) -> Result<(Decimal, TransactionType)> {
    let withdrawal = withdrawal.filter(|w| !w.is_zero());
    let deposit = deposit.filter(|d| !d.is_zero());
    match (withdrawal, deposit) {
        (Some(w), None) if w.is_sign_positive() => Ok((-w, TransactionType::Debit)),
        (None, Some(d)) if d.is_sign_positive() => Ok((d, TransactionType::Credit)),
        (Some(_), Some(_)) => Err(Error::Validation(ValidationError::InvalidInput(
            "A transaction cannot carry both a withdrawal and a deposit".to_string(),
        ))),
        (None, None) => Err(Error::Validation(ValidationError::MissingField(
            "withdrawal or deposit".to_string(),
        ))),
        _ => Err(Error::Validation(ValidationError::InvalidInput(
            "Withdrawal and deposit amounts must be positive".to_string(),
        ))),
    }
}

/// A materialized statement row that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCandidate {
    pub row_number: usize,
    pub date: NaiveDate,
    pub description: String,
    pub payee: Option<String>,
    pub reference_number: Option<String>,
    pub withdrawal: Option<Decimal>,
    pub deposit: Option<Decimal>,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub content_hash: String,
    pub needs_review: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_reason: Option<String>,
    pub raw_row: RawRow,
}

/// A transaction stored in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTransaction {
    pub id: String,
    pub account_id: String,
    pub date: NaiveDate,
    pub description: String,
    pub payee: Option<String>,
    pub reference_number: Option<String>,
    pub withdrawal: Option<Decimal>,
    pub deposit: Option<Decimal>,
    /// `deposit - withdrawal`
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    /// Source row kept verbatim; `None` for manual entries.
    pub raw_row: Option<RawRow>,
    pub import_batch_id: Option<String>,
    pub content_hash: String,
    pub reconciliation_status: ReconciliationStatus,
    pub needs_review: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl CanonicalTransaction {
    pub fn from_candidate(
        candidate: TransactionCandidate,
        account_id: &str,
        import_batch_id: &str,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            account_id: account_id.to_string(),
            date: candidate.date,
            description: candidate.description,
            payee: candidate.payee,
            reference_number: candidate.reference_number,
            withdrawal: candidate.withdrawal,
            deposit: candidate.deposit,
            amount: candidate.amount,
            transaction_type: candidate.transaction_type,
            raw_row: Some(candidate.raw_row),
            import_batch_id: Some(import_batch_id.to_string()),
            content_hash: candidate.content_hash,
            reconciliation_status: ReconciliationStatus::Pending,
            needs_review: candidate.needs_review,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for a hand-entered transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub account_id: String,
    pub date: NaiveDate,
    pub description: String,
    pub payee: Option<String>,
    pub reference_number: Option<String>,
    pub withdrawal: Option<Decimal>,
    pub deposit: Option<Decimal>,
}

impl NewTransaction {
    pub fn validate(&self) -> Result<()> {
        if self.account_id.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "accountId".to_string(),
            )));
        }
        if self.description.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "description".to_string(),
            )));
        }
        derive_amount(self.withdrawal, self.deposit).map(|_| ())
    }
}

/// Replacement values for an existing transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    pub date: NaiveDate,
    pub description: String,
    pub payee: Option<String>,
    pub reference_number: Option<String>,
    pub withdrawal: Option<Decimal>,
    pub deposit: Option<Decimal>,
}

impl TransactionUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "description".to_string(),
            )));
        }
        derive_amount(self.withdrawal, self.deposit).map(|_| ())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub account_id: Option<String>,
    pub import_batch_id: Option<String>,
    pub reconciliation_status: Option<ReconciliationStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn for_account(account_id: &str) -> Self {
        Self {
            account_id: Some(account_id.to_string()),
            ..Default::default()
        }
    }

    pub fn matches(&self, tx: &CanonicalTransaction) -> bool {
        self.account_id.as_ref().map_or(true, |a| *a == tx.account_id)
            && self
                .import_batch_id
                .as_ref()
                .map_or(true, |b| tx.import_batch_id.as_ref() == Some(b))
            && self
                .reconciliation_status
                .map_or(true, |s| s == tx.reconciliation_status)
            && self.start_date.map_or(true, |d| tx.date >= d)
            && self.end_date.map_or(true, |d| tx.date <= d)
    }
}
