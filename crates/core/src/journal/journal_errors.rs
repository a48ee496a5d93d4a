//! Journal error types.

use rust_decimal::Decimal;
use thiserror::Error;

use super::journal_model::EntryStatus;

/// Integrity errors of the balancing engine. All of them are raised before
/// any state change.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JournalError {
    #[error("Entry is not balanced: total debit {total_debit} vs total credit {total_credit}")]
    UnbalancedEntry {
        total_debit: Decimal,
        total_credit: Decimal,
    },

    #[error("Entry needs at least two line items, found {lines}")]
    EmptyEntry { lines: usize },

    #[error("Unknown account(s): {}", .0.join(", "))]
    InvalidAccount(Vec<String>),

    #[error("Cannot {action} an entry that is {status}")]
    InvalidTransition {
        status: EntryStatus,
        action: &'static str,
    },

    #[error("Line {index}: {reason}")]
    InvalidLineItem { index: usize, reason: String },

    #[error("Entry '{0}' was changed by someone else; reload and retry")]
    ConcurrentUpdate(String),

    #[error("A reason is required to reverse an entry")]
    MissingReason,
}
