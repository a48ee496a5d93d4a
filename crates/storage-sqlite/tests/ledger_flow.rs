//! End-to-end flows of the core services over a real SQLite database.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;

use ledgerkeep_core::accounts::{AccountService, AccountServiceTrait, AccountType, NewAccount};
use ledgerkeep_core::imports::{
    CanonicalField, CommitCounts, DecimalFormat, FieldMapping, ImportBatch, ImportBatchStatus,
    ImportError, ImportRepositoryTrait, ImportService, ImportServiceTrait, MappingConfig,
    NewImportBatch, RawRow,
};
use ledgerkeep_core::journal::{
    EntrySource, EntryStatus, JournalError, JournalService, JournalServiceTrait, LineItem,
    NewJournalEntry, ReverseRequest,
};
use ledgerkeep_core::locks::{LockError, LockModule, LockRequest, LockService, LockServiceTrait};
use ledgerkeep_core::settings::LedgerSettings;
use ledgerkeep_core::transactions::{
    CanonicalTransaction, TransactionFilter, TransactionService, TransactionServiceTrait,
};
use ledgerkeep_core::{Error, Result};
use ledgerkeep_storage_sqlite::{
    create_pool, init, run_migrations, spawn_writer, AccountRepository, ImportRepository,
    JournalRepository, LockRepository, TransactionRepository,
};

const STATEMENT: &str = "\
Statement of account,,,
Account: 0042-881,,,
Date,Narration,Withdrawals,Deposits
02-04-2024,Rent,990,
04-04-2024,Office supplies,3854.83,
02-04-2024,Rent,990,
";

struct Ledger {
    accounts: Arc<AccountService>,
    imports: ImportService,
    transactions: Arc<TransactionService>,
    journal: JournalService,
    locks: Arc<LockService>,
    import_repository: Arc<ImportRepository>,
    transaction_repository: Arc<TransactionRepository>,
    _dir: TempDir,
}

async fn ledger() -> Ledger {
    let dir = tempfile::tempdir().unwrap();
    let db_path = init(dir.path().join("ledger.db").to_str().unwrap()).unwrap();
    let pool = create_pool(&db_path).unwrap();
    run_migrations(&pool).unwrap();
    let writer = spawn_writer((*pool).clone());

    let settings = LedgerSettings::default();
    let accounts = Arc::new(AccountService::new(Arc::new(AccountRepository::new(
        pool.clone(),
        writer.clone(),
    ))));
    let locks = Arc::new(LockService::new(Arc::new(LockRepository::new(
        pool.clone(),
        writer.clone(),
    ))));
    let transaction_repository = Arc::new(TransactionRepository::new(pool.clone(), writer.clone()));
    let transactions = Arc::new(TransactionService::new(
        transaction_repository.clone(),
        accounts.clone(),
        locks.clone(),
    ));
    let import_repository = Arc::new(ImportRepository::new(pool.clone(), writer.clone()));
    let imports = ImportService::new(
        import_repository.clone(),
        transaction_repository.clone(),
        accounts.clone(),
        locks.clone(),
        settings.clone(),
    );
    let journal = JournalService::new(
        Arc::new(JournalRepository::new(pool.clone(), writer.clone())),
        accounts.clone(),
        transactions.clone(),
        locks.clone(),
        settings,
    );

    for (id, account_type) in [
        ("bank", AccountType::Bank),
        ("rent", AccountType::Expense),
        ("supplies", AccountType::Expense),
    ] {
        accounts
            .create_account(NewAccount {
                id: Some(id.to_string()),
                name: id.to_string(),
                account_type,
                currency: "USD".to_string(),
                is_active: true,
            })
            .await
            .unwrap();
    }

    Ledger {
        accounts,
        imports,
        transactions,
        journal,
        locks,
        import_repository,
        transaction_repository,
        _dir: dir,
    }
}

fn mapping() -> MappingConfig {
    MappingConfig {
        field_mapping: FieldMapping::new()
            .with(CanonicalField::Date, "Date")
            .with(CanonicalField::Description, "Narration")
            .with(CanonicalField::Withdrawals, "Withdrawals")
            .with(CanonicalField::Deposits, "Deposits"),
        date_format: "dd-MM-yyyy".to_string(),
        decimal_format: DecimalFormat::Plain,
        strip_currency_symbols: true,
    }
}

async fn import_statement(ledger: &Ledger) -> ledgerkeep_core::imports::ImportSummary {
    let preview = ledger
        .imports
        .upload("bank", "april.csv", STATEMENT.as_bytes())
        .await
        .unwrap();
    ledger
        .imports
        .apply_mapping(&preview.batch.id, mapping())
        .await
        .unwrap();
    ledger.imports.commit(&preview.batch.id).await.unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_import_commits_once_and_dedupes_reimport() {
    let ledger = ledger().await;

    let first = import_statement(&ledger).await;
    assert_eq!(first.batch.status, ImportBatchStatus::Committed);
    assert_eq!(first.batch.committed_count, 2);
    assert_eq!(first.batch.duplicate_count, 1);
    assert_eq!(first.batch.skipped_count, 0);
    assert_eq!(first.duplicate_rows, vec![6]);

    let stored = ledger
        .transactions
        .list_transactions(&TransactionFilter::for_account("bank"))
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].amount, dec!(-990));
    assert_eq!(stored[1].withdrawal, Some(dec!(3854.83)));

    let second = import_statement(&ledger).await;
    assert_eq!(second.batch.committed_count, 0);
    assert_eq!(second.batch.duplicate_count, 3);

    let batches = ledger.imports.list_batches(Some("bank")).unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].id, second.batch.id);

    // The committed mapping comes back as the suggestion for the next upload.
    let preview = ledger
        .imports
        .upload("bank", "may.csv", STATEMENT.as_bytes())
        .await
        .unwrap();
    assert_eq!(preview.suggested_mapping, Some(mapping()));
}

/// Serves a batch and its rows as they were read before another request
/// committed them.
struct SnapshotReads {
    inner: Arc<ImportRepository>,
    batch: ImportBatch,
    rows: Vec<RawRow>,
}

#[async_trait]
impl ImportRepositoryTrait for SnapshotReads {
    async fn create(&self, new_batch: NewImportBatch) -> Result<ImportBatch> {
        self.inner.create(new_batch).await
    }

    fn get_by_id(&self, _batch_id: &str) -> Result<ImportBatch> {
        Ok(self.batch.clone())
    }

    fn list(&self, account_id: Option<&str>) -> Result<Vec<ImportBatch>> {
        self.inner.list(account_id)
    }

    fn list_rows(&self, _batch_id: &str, limit: Option<usize>) -> Result<Vec<RawRow>> {
        Ok(self
            .rows
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn save_mapping(&self, batch_id: &str, mapping: MappingConfig) -> Result<ImportBatch> {
        self.inner.save_mapping(batch_id, mapping).await
    }

    async fn commit_batch(
        &self,
        batch_id: &str,
        transactions: Vec<CanonicalTransaction>,
        counts: CommitCounts,
    ) -> Result<ImportBatch> {
        self.inner.commit_batch(batch_id, transactions, counts).await
    }

    async fn mark_failed(&self, batch_id: &str, message: String) -> Result<ImportBatch> {
        self.inner.mark_failed(batch_id, message).await
    }

    async fn delete(&self, batch_id: &str) -> Result<()> {
        self.inner.delete(batch_id).await
    }

    fn get_saved_mapping(&self, account_id: &str) -> Result<Option<MappingConfig>> {
        self.inner.get_saved_mapping(account_id)
    }

    async fn save_account_mapping(&self, account_id: &str, mapping: MappingConfig) -> Result<()> {
        self.inner.save_account_mapping(account_id, mapping).await
    }
}

#[tokio::test]
async fn test_losing_concurrent_commit_keeps_the_winner() {
    let ledger = ledger().await;
    let preview = ledger
        .imports
        .upload("bank", "april.csv", STATEMENT.as_bytes())
        .await
        .unwrap();
    let batch_id = preview.batch.id.clone();
    ledger
        .imports
        .apply_mapping(&batch_id, mapping())
        .await
        .unwrap();

    // The second request has already read the mapped batch.
    let late = ImportService::new(
        Arc::new(SnapshotReads {
            inner: ledger.import_repository.clone(),
            batch: ledger.imports.get_batch(&batch_id).unwrap(),
            rows: ledger.import_repository.list_rows(&batch_id, None).unwrap(),
        }),
        ledger.transaction_repository.clone(),
        ledger.accounts.clone(),
        ledger.locks.clone(),
        LedgerSettings::default(),
    );

    let won = ledger.imports.commit(&batch_id).await.unwrap();
    assert_eq!(won.batch.committed_count, 2);

    match late.commit(&batch_id).await {
        Err(Error::Import(ImportError::InvalidBatchStatus { status, .. })) => {
            assert_eq!(status, ImportBatchStatus::Committed)
        }
        other => panic!("expected InvalidBatchStatus, got {:?}", other),
    }

    let stored = ledger
        .transactions
        .list_transactions(&TransactionFilter::for_account("bank"))
        .unwrap();
    assert_eq!(stored.len(), 2);
    let batch = ledger.imports.get_batch(&batch_id).unwrap();
    assert_eq!(batch.status, ImportBatchStatus::Committed);
    assert!(batch.error_message.is_none());
}

#[tokio::test]
async fn test_journal_post_and_reverse_round_trip() {
    let ledger = ledger().await;
    assert!(ledger.accounts.get_account("rent").is_ok());

    let draft = ledger
        .journal
        .create_draft(NewJournalEntry {
            date: date(2024, 4, 2),
            description: "April rent".to_string(),
            reference: None,
            source: EntrySource::Manual,
            currency: "USD".to_string(),
            line_items: vec![
                LineItem::debit("rent", dec!(990.00)),
                LineItem::credit("bank", dec!(990.00)),
            ],
        })
        .await
        .unwrap();
    assert_eq!(draft.entry_number, "JE-00001");

    let posted = ledger.journal.post_entry(&draft.id).await.unwrap();
    assert_eq!(posted.status, EntryStatus::Posted);

    let mirror = ledger
        .journal
        .reverse_entry(
            &draft.id,
            ReverseRequest {
                reason: "Booked twice".to_string(),
                date: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(mirror.entry_number, "JE-00002");
    assert_eq!(mirror.line_items[0], LineItem::credit("rent", dec!(990.00)));
    assert_eq!(mirror.line_items[1], LineItem::debit("bank", dec!(990.00)));

    let original = ledger.journal.get_entry(&draft.id).unwrap();
    assert_eq!(original.status, EntryStatus::Reversed);
    assert_eq!(original.line_items, posted.line_items);
}

#[tokio::test]
async fn test_unbalanced_entry_cannot_post() {
    let ledger = ledger().await;
    let draft = ledger
        .journal
        .create_draft(NewJournalEntry {
            date: date(2024, 4, 2),
            description: "Supplies".to_string(),
            reference: None,
            source: EntrySource::Manual,
            currency: "USD".to_string(),
            line_items: vec![
                LineItem::debit("supplies", dec!(500.00)),
                LineItem::credit("bank", dec!(499.99)),
            ],
        })
        .await
        .unwrap();

    let err = ledger.journal.post_entry(&draft.id).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Journal(JournalError::UnbalancedEntry { .. })
    ));
    assert_eq!(
        ledger.journal.get_entry(&draft.id).unwrap().status,
        EntryStatus::Draft
    );
}

#[tokio::test]
async fn test_banking_lock_gates_imported_rows_and_persists() {
    let ledger = ledger().await;
    ledger
        .locks
        .lock(
            LockModule::Banking,
            LockRequest {
                lock_date: date(2024, 4, 3),
                reason: Some("Reconciled through the 3rd".to_string()),
            },
            "alice",
        )
        .await
        .unwrap();

    let summary = import_statement(&ledger).await;
    assert_eq!(summary.batch.committed_count, 1);
    assert_eq!(summary.batch.skipped_count, 2);

    assert!(matches!(
        ledger
            .locks
            .ensure_mutation_allowed(LockModule::Banking, date(2024, 4, 2)),
        Err(Error::Lock(LockError::PeriodLocked { .. }))
    ));
    assert!(ledger
        .locks
        .ensure_mutation_allowed(LockModule::Banking, date(2024, 4, 4))
        .is_ok());

    let trail = ledger.locks.get_audit_trail(LockModule::Banking).unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].actor, "alice");
}
