//! In-memory repositories shared by the service tests.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use crate::accounts::{Account, AccountRepositoryTrait, AccountType, NewAccount};
use crate::errors::{DatabaseError, Error, Result};
use crate::imports::{
    CommitCounts, ImportBatch, ImportBatchStatus, ImportRepositoryTrait, MappingConfig,
    NewImportBatch, RawRow,
};
use crate::journal::{
    ensure_postable, format_entry_number, EntryStatus, JournalEntry, JournalError,
    JournalFilter, JournalRepositoryTrait,
};
use crate::locks::{LockAuditEntry, LockModule, LockRepositoryTrait, LockState};
use crate::transactions::{CanonicalTransaction, TransactionFilter, TransactionRepositoryTrait};

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

// --- Accounts ---

#[derive(Clone, Default)]
pub struct InMemoryAccounts {
    accounts: Arc<Mutex<Vec<Account>>>,
}

impl InMemoryAccounts {
    /// USD bank accounts with the given ids.
    pub fn with_ids(ids: &[&str]) -> Self {
        let repo = Self::default();
        for id in ids {
            repo.add(id, AccountType::Bank);
        }
        repo
    }

    pub fn add(&self, id: &str, account_type: AccountType) {
        self.accounts.lock().unwrap().push(Account {
            id: id.to_string(),
            name: id.to_string(),
            account_type,
            currency: "USD".to_string(),
            is_active: true,
            created_at: now(),
            updated_at: now(),
        });
    }
}

#[async_trait]
impl AccountRepositoryTrait for InMemoryAccounts {
    async fn create(&self, new_account: NewAccount) -> Result<Account> {
        let account = Account {
            id: new_account
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: new_account.name,
            account_type: new_account.account_type,
            currency: new_account.currency,
            is_active: new_account.is_active,
            created_at: now(),
            updated_at: now(),
        };
        self.accounts.lock().unwrap().push(account.clone());
        Ok(account)
    }

    fn get_by_id(&self, account_id: &str) -> Result<Account> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == account_id)
            .cloned()
            .ok_or_else(|| Error::not_found("Account", account_id))
    }

    fn list(
        &self,
        is_active_filter: Option<bool>,
        account_ids: Option<&[String]>,
    ) -> Result<Vec<Account>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| is_active_filter.map_or(true, |active| a.is_active == active))
            .filter(|a| account_ids.map_or(true, |ids| ids.contains(&a.id)))
            .cloned()
            .collect())
    }
}

// --- Locks ---

#[derive(Default)]
pub struct InMemoryLocks {
    states: Mutex<HashMap<LockModule, LockState>>,
    audit: Mutex<Vec<LockAuditEntry>>,
}

#[async_trait]
impl LockRepositoryTrait for InMemoryLocks {
    fn get_state(&self, module: LockModule) -> Result<Option<LockState>> {
        Ok(self.states.lock().unwrap().get(&module).cloned())
    }

    fn list_states(&self) -> Result<Vec<LockState>> {
        Ok(self.states.lock().unwrap().values().cloned().collect())
    }

    async fn save_state(&self, state: LockState, audit: LockAuditEntry) -> Result<LockState> {
        self.states
            .lock()
            .unwrap()
            .insert(state.module, state.clone());
        self.audit.lock().unwrap().push(audit);
        Ok(state)
    }

    fn list_audit(&self, module: LockModule) -> Result<Vec<LockAuditEntry>> {
        Ok(self
            .audit
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.module == module)
            .cloned()
            .collect())
    }
}

// --- Transactions ---

#[derive(Clone, Default)]
pub struct InMemoryTransactions {
    transactions: Arc<Mutex<Vec<CanonicalTransaction>>>,
}

impl InMemoryTransactions {
    pub fn insert_many(&self, transactions: Vec<CanonicalTransaction>) {
        self.transactions.lock().unwrap().extend(transactions);
    }

    pub fn count(&self) -> usize {
        self.transactions.lock().unwrap().len()
    }
}

#[async_trait]
impl TransactionRepositoryTrait for InMemoryTransactions {
    fn get_by_id(&self, transaction_id: &str) -> Result<CanonicalTransaction> {
        self.transactions
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == transaction_id)
            .cloned()
            .ok_or_else(|| Error::not_found("Transaction", transaction_id))
    }

    fn list(&self, filter: &TransactionFilter) -> Result<Vec<CanonicalTransaction>> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    fn find_existing_hashes(
        &self,
        account_id: &str,
        hashes: &[String],
    ) -> Result<HashSet<String>> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.account_id == account_id && hashes.contains(&t.content_hash))
            .map(|t| t.content_hash.clone())
            .collect())
    }

    async fn create(&self, transaction: CanonicalTransaction) -> Result<CanonicalTransaction> {
        self.transactions.lock().unwrap().push(transaction.clone());
        Ok(transaction)
    }

    async fn update(&self, transaction: CanonicalTransaction) -> Result<CanonicalTransaction> {
        let mut all = self.transactions.lock().unwrap();
        let slot = all
            .iter_mut()
            .find(|t| t.id == transaction.id)
            .ok_or_else(|| Error::not_found("Transaction", transaction.id.clone()))?;
        *slot = transaction.clone();
        Ok(transaction)
    }

    async fn delete(&self, transaction_id: &str) -> Result<()> {
        self.transactions
            .lock()
            .unwrap()
            .retain(|t| t.id != transaction_id);
        Ok(())
    }

    async fn delete_by_batch(&self, import_batch_id: &str) -> Result<usize> {
        let mut all = self.transactions.lock().unwrap();
        let before = all.len();
        all.retain(|t| t.import_batch_id.as_deref() != Some(import_batch_id));
        Ok(before - all.len())
    }
}

// --- Imports ---

/// Writes committed transactions into the shared transaction store. When
/// `fail_next_commit` is set, the next commit writes its transactions and then
/// errors, leaving cleanup to the caller.
pub struct InMemoryImports {
    batches: Mutex<Vec<ImportBatch>>,
    rows: Mutex<HashMap<String, Vec<RawRow>>>,
    saved_mappings: Mutex<HashMap<String, MappingConfig>>,
    transactions: InMemoryTransactions,
    fail_commit: AtomicBool,
}

impl InMemoryImports {
    pub fn new(transactions: InMemoryTransactions) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            rows: Mutex::new(HashMap::new()),
            saved_mappings: Mutex::new(HashMap::new()),
            transactions,
            fail_commit: AtomicBool::new(false),
        }
    }

    pub fn fail_next_commit(&self) {
        self.fail_commit.store(true, Ordering::SeqCst);
    }

    fn modify<F>(&self, batch_id: &str, f: F) -> Result<ImportBatch>
    where
        F: FnOnce(&mut ImportBatch),
    {
        let mut batches = self.batches.lock().unwrap();
        let batch = batches
            .iter_mut()
            .find(|b| b.id == batch_id)
            .ok_or_else(|| Error::not_found("Import batch", batch_id))?;
        f(batch);
        batch.updated_at = now();
        Ok(batch.clone())
    }
}

#[async_trait]
impl ImportRepositoryTrait for InMemoryImports {
    async fn create(&self, new_batch: NewImportBatch) -> Result<ImportBatch> {
        let batch = ImportBatch {
            id: uuid::Uuid::now_v7().to_string(),
            account_id: new_batch.account_id,
            file_name: new_batch.file_name,
            source: new_batch.source,
            headers: new_batch.headers,
            header_row_number: new_batch.header_row_number,
            mapping: None,
            status: ImportBatchStatus::Uploaded,
            total_rows: new_batch.rows.len(),
            committed_count: 0,
            skipped_count: 0,
            duplicate_count: 0,
            flagged_count: 0,
            skipped_rows: Vec::new(),
            error_message: None,
            created_at: now(),
            updated_at: now(),
        };
        self.rows
            .lock()
            .unwrap()
            .insert(batch.id.clone(), new_batch.rows);
        self.batches.lock().unwrap().push(batch.clone());
        Ok(batch)
    }

    fn get_by_id(&self, batch_id: &str) -> Result<ImportBatch> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == batch_id)
            .cloned()
            .ok_or_else(|| Error::not_found("Import batch", batch_id))
    }

    fn list(&self, account_id: Option<&str>) -> Result<Vec<ImportBatch>> {
        Ok(self
            .batches
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|b| account_id.map_or(true, |a| b.account_id == a))
            .cloned()
            .collect())
    }

    fn list_rows(&self, batch_id: &str, limit: Option<usize>) -> Result<Vec<RawRow>> {
        let rows = self.rows.lock().unwrap();
        let all = rows.get(batch_id).cloned().unwrap_or_default();
        Ok(all.into_iter().take(limit.unwrap_or(usize::MAX)).collect())
    }

    async fn save_mapping(&self, batch_id: &str, mapping: MappingConfig) -> Result<ImportBatch> {
        self.modify(batch_id, |b| {
            b.mapping = Some(mapping);
            b.status = ImportBatchStatus::Mapped;
        })
    }

    async fn commit_batch(
        &self,
        batch_id: &str,
        transactions: Vec<CanonicalTransaction>,
        counts: CommitCounts,
    ) -> Result<ImportBatch> {
        self.transactions.insert_many(transactions);
        if self.fail_commit.swap(false, Ordering::SeqCst) {
            return Err(Error::Database(DatabaseError::TransactionFailed(
                "disk I/O error".to_string(),
            )));
        }
        self.rows.lock().unwrap().remove(batch_id);
        self.modify(batch_id, |b| {
            b.status = ImportBatchStatus::Committed;
            b.committed_count = counts.committed;
            b.skipped_count = counts.skipped;
            b.duplicate_count = counts.duplicate;
            b.flagged_count = counts.flagged;
            b.skipped_rows = counts.skipped_rows;
        })
    }

    async fn mark_failed(&self, batch_id: &str, message: String) -> Result<ImportBatch> {
        self.modify(batch_id, |b| {
            b.status = ImportBatchStatus::Failed;
            b.error_message = Some(message);
        })
    }

    async fn delete(&self, batch_id: &str) -> Result<()> {
        self.batches.lock().unwrap().retain(|b| b.id != batch_id);
        self.rows.lock().unwrap().remove(batch_id);
        Ok(())
    }

    fn get_saved_mapping(&self, account_id: &str) -> Result<Option<MappingConfig>> {
        Ok(self.saved_mappings.lock().unwrap().get(account_id).cloned())
    }

    async fn save_account_mapping(&self, account_id: &str, mapping: MappingConfig) -> Result<()> {
        self.saved_mappings
            .lock()
            .unwrap()
            .insert(account_id.to_string(), mapping);
        Ok(())
    }
}

// --- Journal ---

#[derive(Default)]
pub struct InMemoryJournal {
    entries: Mutex<Vec<JournalEntry>>,
    sequence: AtomicI64,
}

impl InMemoryJournal {
    fn next_number(&self, prefix: &str) -> String {
        format_entry_number(prefix, self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Bumps the stored version as if another writer had touched the entry.
    pub fn touch(&self, entry_id: &str) {
        if let Some(entry) = self
            .entries
            .lock()
            .unwrap()
            .iter_mut()
            .find(|e| e.id == entry_id)
        {
            entry.version += 1;
        }
    }
}

fn current<'a>(
    entries: &'a mut [JournalEntry],
    entry_id: &str,
    expected_version: i32,
) -> Result<&'a mut JournalEntry> {
    let entry = entries
        .iter_mut()
        .find(|e| e.id == entry_id)
        .ok_or_else(|| Error::not_found("Journal entry", entry_id))?;
    if entry.version != expected_version {
        return Err(JournalError::ConcurrentUpdate(entry_id.to_string()).into());
    }
    Ok(entry)
}

#[async_trait]
impl JournalRepositoryTrait for InMemoryJournal {
    fn get_by_id(&self, entry_id: &str) -> Result<JournalEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == entry_id)
            .cloned()
            .ok_or_else(|| Error::not_found("Journal entry", entry_id))
    }

    fn list(&self, filter: &JournalFilter) -> Result<Vec<JournalEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    async fn create(&self, mut entry: JournalEntry, number_prefix: &str) -> Result<JournalEntry> {
        entry.entry_number = self.next_number(number_prefix);
        self.entries.lock().unwrap().push(entry.clone());
        Ok(entry)
    }

    async fn update_draft(
        &self,
        mut entry: JournalEntry,
        expected_version: i32,
    ) -> Result<JournalEntry> {
        let mut entries = self.entries.lock().unwrap();
        let stored = current(&mut entries, &entry.id, expected_version)?;
        stored.ensure_draft("edit")?;
        entry.version = expected_version + 1;
        *stored = entry.clone();
        Ok(entry)
    }

    async fn delete_draft(&self, entry_id: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .retain(|e| !(e.id == entry_id && e.status == EntryStatus::Draft));
        Ok(())
    }

    async fn post(
        &self,
        entry_id: &str,
        expected_version: i32,
        tolerance: Decimal,
        posted_at: NaiveDateTime,
    ) -> Result<JournalEntry> {
        let mut entries = self.entries.lock().unwrap();
        let stored = current(&mut entries, entry_id, expected_version)?;
        stored.ensure_draft("post")?;
        ensure_postable(&stored.line_items, tolerance)?;
        stored.status = EntryStatus::Posted;
        stored.posted_at = Some(posted_at);
        stored.version += 1;
        stored.updated_at = posted_at;
        Ok(stored.clone())
    }

    async fn reverse(
        &self,
        original_id: &str,
        expected_version: i32,
        mut mirror: JournalEntry,
        number_prefix: &str,
    ) -> Result<JournalEntry> {
        let mut entries = self.entries.lock().unwrap();
        let original = current(&mut entries, original_id, expected_version)?;
        original.ensure_reversible()?;
        original.status = EntryStatus::Reversed;
        original.reversed_by = Some(mirror.id.clone());
        original.reversal_reason = mirror.reversal_reason.clone();
        original.version += 1;
        original.updated_at = mirror.created_at;

        mirror.entry_number = self.next_number(number_prefix);
        entries.push(mirror.clone());
        Ok(mirror)
    }
}
