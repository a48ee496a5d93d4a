//! SQLite storage implementation for journal entries and their line items.

mod model;
mod repository;

pub use model::{JournalEntryDB, JournalLineDB};
pub use repository::JournalRepository;
