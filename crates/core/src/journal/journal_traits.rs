//! Journal repository and service traits.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::journal_model::{
    JournalEntry, JournalEntryUpdate, JournalFilter, NewJournalEntry, ReverseRequest,
    TransactionEntryRequest,
};
use crate::errors::Result;

/// Storage contract for journal entries.
#[async_trait]
pub trait JournalRepositoryTrait: Send + Sync {
    fn get_by_id(&self, entry_id: &str) -> Result<JournalEntry>;

    /// Entries newest first.
    fn list(&self, filter: &JournalFilter) -> Result<Vec<JournalEntry>>;

    /// Inserts `entry`, assigning the next sequential number under `number_prefix`.
    async fn create(&self, entry: JournalEntry, number_prefix: &str) -> Result<JournalEntry>;

    /// Replaces a draft. Fails with `ConcurrentUpdate` unless the stored row is
    /// still a draft at `expected_version`.
    async fn update_draft(&self, entry: JournalEntry, expected_version: i32)
        -> Result<JournalEntry>;

    async fn delete_draft(&self, entry_id: &str) -> Result<()>;

    /// Flips a draft to `posted`. Inside the write the stored row must still be
    /// a draft at `expected_version` and its lines must balance within
    /// `tolerance`.
    async fn post(
        &self,
        entry_id: &str,
        expected_version: i32,
        tolerance: Decimal,
        posted_at: NaiveDateTime,
    ) -> Result<JournalEntry>;

    /// Inserts the posted `mirror` and marks the original `reversed`, in one
    /// write. Returns the mirror.
    async fn reverse(
        &self,
        original_id: &str,
        expected_version: i32,
        mirror: JournalEntry,
        number_prefix: &str,
    ) -> Result<JournalEntry>;
}

#[async_trait]
pub trait JournalServiceTrait: Send + Sync {
    fn get_entry(&self, entry_id: &str) -> Result<JournalEntry>;

    fn list_entries(&self, filter: &JournalFilter) -> Result<Vec<JournalEntry>>;

    /// Stores a new entry in `draft`. Drafts may be unbalanced.
    async fn create_draft(&self, new_entry: NewJournalEntry) -> Result<JournalEntry>;

    async fn update_draft(&self, entry_id: &str, update: JournalEntryUpdate)
        -> Result<JournalEntry>;

    async fn delete_draft(&self, entry_id: &str) -> Result<()>;

    /// `draft` → `posted`, enforcing balance.
    async fn post_entry(&self, entry_id: &str) -> Result<JournalEntry>;

    /// `posted` → `reversed`. Returns the mirror entry.
    async fn reverse_entry(&self, entry_id: &str, request: ReverseRequest)
        -> Result<JournalEntry>;

    /// Creates and posts a non-manual entry in one step.
    async fn record_system_entry(&self, new_entry: NewJournalEntry) -> Result<JournalEntry>;

    /// Drafts a two-line entry for a bank transaction against a contra account.
    async fn draft_from_transaction(&self, request: TransactionEntryRequest)
        -> Result<JournalEntry>;
}
