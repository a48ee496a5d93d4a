//! Journal entry domain models.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::balancing::{totals, Totals};
use super::journal_errors::JournalError;
use crate::constants::ENTRY_NUMBER_WIDTH;
use crate::errors::{Error, Result, ValidationError};

/// Where an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    #[default]
    Manual,
    System,
    CurrencyAdjustment,
    Import,
}

impl EntrySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntrySource::Manual => "manual",
            EntrySource::System => "system",
            EntrySource::CurrencyAdjustment => "currency_adjustment",
            EntrySource::Import => "import",
        }
    }
}

impl fmt::Display for EntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntrySource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "manual" => Ok(EntrySource::Manual),
            "system" => Ok(EntrySource::System),
            "currency_adjustment" => Ok(EntrySource::CurrencyAdjustment),
            "import" => Ok(EntrySource::Import),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown entry source '{}'",
                other
            )))),
        }
    }
}

/// `draft` → `posted` → `reversed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Draft,
    Posted,
    Reversed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Draft => "draft",
            EntryStatus::Posted => "posted",
            EntryStatus::Reversed => "reversed",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(EntryStatus::Draft),
            "posted" => Ok(EntryStatus::Posted),
            "reversed" => Ok(EntryStatus::Reversed),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown entry status '{}'",
                other
            )))),
        }
    }
}

/// One side of an entry. Exactly one of `debit`/`credit` is non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub account_id: String,
    #[serde(default)]
    pub debit: Decimal,
    #[serde(default)]
    pub credit: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl LineItem {
    pub fn debit(account_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account_id: account_id.into(),
            debit: amount,
            credit: Decimal::ZERO,
            description: None,
        }
    }

    pub fn credit(account_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account_id: account_id.into(),
            debit: Decimal::ZERO,
            credit: amount,
            description: None,
        }
    }

    /// The same line with debit and credit swapped.
    pub fn mirrored(&self) -> Self {
        Self {
            account_id: self.account_id.clone(),
            debit: self.credit,
            credit: self.debit,
            description: self.description.clone(),
        }
    }
}

/// A double-entry journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    /// Human-readable sequential number, e.g. `JE-00042`. Empty until stored.
    pub entry_number: String,
    pub date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub source: EntrySource,
    pub status: EntryStatus,
    pub currency: String,
    pub line_items: Vec<LineItem>,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    /// Set on a mirror entry: the entry it reverses.
    pub reversal_of: Option<String>,
    /// Set on a reversed entry: its mirror.
    pub reversed_by: Option<String>,
    pub reversal_reason: Option<String>,
    /// Bumped on every stored change; guards concurrent edits and posting.
    pub version: i32,
    pub posted_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl JournalEntry {
    pub fn totals(&self) -> Totals {
        totals(&self.line_items)
    }

    /// Recomputes `total_debit`/`total_credit` from the lines.
    pub fn refresh_totals(&mut self) {
        let t = self.totals();
        self.total_debit = t.debit;
        self.total_credit = t.credit;
    }

    pub fn ensure_draft(&self, action: &'static str) -> std::result::Result<(), JournalError> {
        match self.status {
            EntryStatus::Draft => Ok(()),
            status => Err(JournalError::InvalidTransition { status, action }),
        }
    }

    pub fn ensure_reversible(&self) -> std::result::Result<(), JournalError> {
        match self.status {
            EntryStatus::Posted => Ok(()),
            status => Err(JournalError::InvalidTransition {
                status,
                action: "reverse",
            }),
        }
    }

    /// Distinct account ids referenced by the lines, in line order.
    pub fn account_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for line in &self.line_items {
            if !ids.contains(&line.account_id) {
                ids.push(line.account_id.clone());
            }
        }
        ids
    }
}

/// `JE-` + zero-padded sequence.
pub fn format_entry_number(prefix: &str, sequence: i64) -> String {
    format!("{}{:0width$}", prefix, sequence, width = ENTRY_NUMBER_WIDTH)
}

/// Input for a new entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJournalEntry {
    pub date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    #[serde(default)]
    pub source: EntrySource,
    pub currency: String,
    pub line_items: Vec<LineItem>,
}

impl NewJournalEntry {
    pub fn validate(&self) -> Result<()> {
        validate_header(&self.description, &self.currency)
    }
}

/// Replacement values for a draft. `version` must match the stored draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntryUpdate {
    pub date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub currency: String,
    pub line_items: Vec<LineItem>,
    pub version: i32,
}

impl JournalEntryUpdate {
    pub fn validate(&self) -> Result<()> {
        validate_header(&self.description, &self.currency)
    }
}

fn validate_header(description: &str, currency: &str) -> Result<()> {
    if description.trim().is_empty() {
        return Err(Error::Validation(ValidationError::MissingField(
            "description".to_string(),
        )));
    }
    if currency.trim().len() != 3 {
        return Err(Error::Validation(ValidationError::InvalidInput(format!(
            "Currency '{}' is not a three-letter code",
            currency
        ))));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseRequest {
    #[serde(default)]
    pub reason: String,
    /// Date of the mirror entry; the original's date when absent.
    pub date: Option<NaiveDate>,
}

/// Drafts an entry from a committed bank transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEntryRequest {
    pub transaction_id: String,
    /// Account on the other side of the bank account (income, expense, ...).
    pub contra_account_id: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalFilter {
    pub status: Option<EntryStatus>,
    pub source: Option<EntrySource>,
    pub account_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl JournalFilter {
    pub fn matches(&self, entry: &JournalEntry) -> bool {
        self.status.map_or(true, |s| s == entry.status)
            && self.source.map_or(true, |s| s == entry.source)
            && self.account_id.as_ref().map_or(true, |a| {
                entry.line_items.iter().any(|l| &l.account_id == a)
            })
            && self.start_date.map_or(true, |d| entry.date >= d)
            && self.end_date.map_or(true, |d| entry.date <= d)
    }
}
