//! Journal module - double-entry entries and the balancing engine.

mod balancing;
mod journal_errors;
mod journal_model;
mod journal_service;
mod journal_traits;


pub use balancing::{ensure_postable, mirror_lines, totals, validate_line, validate_lines, Totals};
pub use journal_errors::JournalError;
pub use journal_model::{
    format_entry_number, EntrySource, EntryStatus, JournalEntry, JournalEntryUpdate,
    JournalFilter, LineItem, NewJournalEntry, ReverseRequest, TransactionEntryRequest,
};
pub use journal_service::JournalService;
pub use journal_traits::{JournalRepositoryTrait, JournalServiceTrait};
