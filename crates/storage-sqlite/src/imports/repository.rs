use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::{account_mappings, import_batches, import_rows, transactions};
use crate::transactions::TransactionDB;
use crate::utils::{count_to_db, from_json, rows_per_insert, to_json};

use super::model::{AccountMappingDB, ImportBatchDB, ImportRowDB};
use ledgerkeep_core::imports::{
    CommitCounts, ImportBatch, ImportBatchStatus, ImportRepositoryTrait, MappingConfig,
    NewImportBatch, RawRow,
};
use ledgerkeep_core::transactions::CanonicalTransaction;
use ledgerkeep_core::{Error, Result};

const IMPORT_ROW_COLUMNS: usize = 3;
const TRANSACTION_COLUMNS: usize = 17;

pub struct ImportRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ImportRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

fn load_batch(conn: &mut SqliteConnection, batch_id: &str) -> Result<ImportBatch> {
    import_batches::table
        .find(batch_id)
        .select(ImportBatchDB::as_select())
        .first::<ImportBatchDB>(conn)
        .optional()
        .into_core()?
        .ok_or_else(|| Error::not_found("Import batch", batch_id))
        .and_then(ImportBatch::try_from)
}

#[async_trait]
impl ImportRepositoryTrait for ImportRepository {
    /// Stores the batch header and every raw row in one write.
    async fn create(&self, new_batch: NewImportBatch) -> Result<ImportBatch> {
        let batch_id = uuid::Uuid::now_v7().to_string();
        let batch_db =
            ImportBatchDB::from_new(batch_id.clone(), &new_batch, chrono::Utc::now().naive_utc())?;
        let rows = new_batch
            .rows
            .iter()
            .map(|row| ImportRowDB::from_raw(&batch_id, row))
            .collect::<Result<Vec<_>>>()?;

        self.writer
            .exec(move |conn| {
                diesel::insert_into(import_batches::table)
                    .values(&batch_db)
                    .execute(conn)
                    .into_core()?;
                for chunk in rows.chunks(rows_per_insert(IMPORT_ROW_COLUMNS)) {
                    diesel::insert_into(import_rows::table)
                        .values(chunk)
                        .execute(conn)
                        .into_core()?;
                }
                ImportBatch::try_from(batch_db)
            })
            .await
    }

    fn get_by_id(&self, batch_id: &str) -> Result<ImportBatch> {
        let mut conn = get_connection(&self.pool)?;
        load_batch(&mut conn, batch_id)
    }

    /// Batches newest first.
    fn list(&self, account_id: Option<&str>) -> Result<Vec<ImportBatch>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = import_batches::table.into_boxed();
        if let Some(account_id) = account_id {
            query = query.filter(import_batches::account_id.eq(account_id));
        }
        query
            .select(ImportBatchDB::as_select())
            .order((import_batches::created_at.desc(), import_batches::id.desc()))
            .load::<ImportBatchDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(ImportBatch::try_from)
            .collect()
    }

    fn list_rows(&self, batch_id: &str, limit: Option<usize>) -> Result<Vec<RawRow>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = import_rows::table
            .filter(import_rows::batch_id.eq(batch_id))
            .order(import_rows::row_number.asc())
            .select(ImportRowDB::as_select())
            .into_boxed();
        if let Some(limit) = limit {
            query = query.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        query
            .load::<ImportRowDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(RawRow::try_from)
            .collect()
    }

    async fn save_mapping(&self, batch_id: &str, mapping: MappingConfig) -> Result<ImportBatch> {
        let batch_id = batch_id.to_string();
        let mapping_json = to_json(&mapping)?;
        self.writer
            .exec(move |conn| {
                load_batch(conn, &batch_id)?;
                diesel::update(import_batches::table.find(&batch_id))
                    .set((
                        import_batches::mapping.eq(Some(mapping_json)),
                        import_batches::status.eq(ImportBatchStatus::Mapped.as_str()),
                        import_batches::updated_at.eq(chrono::Utc::now().naive_utc()),
                    ))
                    .execute(conn)
                    .into_core()?;
                load_batch(conn, &batch_id)
            })
            .await
    }

    /// Inserts the transactions, stores the final counts and drops the raw
    /// rows. Runs as one immediate transaction on the writer, so a failure
    /// leaves neither transactions nor a committed batch behind.
    async fn commit_batch(
        &self,
        batch_id: &str,
        committed: Vec<CanonicalTransaction>,
        counts: CommitCounts,
    ) -> Result<ImportBatch> {
        let batch_id = batch_id.to_string();
        let rows = committed
            .iter()
            .map(TransactionDB::from_domain)
            .collect::<Result<Vec<_>>>()?;
        let skipped_rows = to_json(&counts.skipped_rows)?;

        self.writer
            .exec(move |conn| {
                let batch = load_batch(conn, &batch_id)?;
                batch.ensure_status(&[ImportBatchStatus::Mapped])?;

                for chunk in rows.chunks(rows_per_insert(TRANSACTION_COLUMNS)) {
                    diesel::insert_into(transactions::table)
                        .values(chunk)
                        .execute(conn)
                        .into_core()?;
                }

                let dropped = diesel::delete(
                    import_rows::table.filter(import_rows::batch_id.eq(&batch_id)),
                )
                .execute(conn)
                .into_core()?;
                debug!("Dropped {} raw rows of batch {}", dropped, batch_id);

                diesel::update(import_batches::table.find(&batch_id))
                    .set((
                        import_batches::status.eq(ImportBatchStatus::Committed.as_str()),
                        import_batches::committed_count.eq(count_to_db(counts.committed)),
                        import_batches::skipped_count.eq(count_to_db(counts.skipped)),
                        import_batches::duplicate_count.eq(count_to_db(counts.duplicate)),
                        import_batches::flagged_count.eq(count_to_db(counts.flagged)),
                        import_batches::skipped_rows.eq(skipped_rows),
                        import_batches::error_message.eq(None::<String>),
                        import_batches::updated_at.eq(chrono::Utc::now().naive_utc()),
                    ))
                    .execute(conn)
                    .into_core()?;

                load_batch(conn, &batch_id)
            })
            .await
    }

    async fn mark_failed(&self, batch_id: &str, message: String) -> Result<ImportBatch> {
        let batch_id = batch_id.to_string();
        self.writer
            .exec(move |conn| {
                load_batch(conn, &batch_id)?.ensure_status(&[
                    ImportBatchStatus::Uploaded,
                    ImportBatchStatus::Mapped,
                    ImportBatchStatus::Failed,
                ])?;
                diesel::update(import_batches::table.find(&batch_id))
                    .set((
                        import_batches::status.eq(ImportBatchStatus::Failed.as_str()),
                        import_batches::error_message.eq(Some(message)),
                        import_batches::updated_at.eq(chrono::Utc::now().naive_utc()),
                    ))
                    .execute(conn)
                    .into_core()?;
                load_batch(conn, &batch_id)
            })
            .await
    }

    async fn delete(&self, batch_id: &str) -> Result<()> {
        let batch_id = batch_id.to_string();
        self.writer
            .exec(move |conn| {
                diesel::delete(import_rows::table.filter(import_rows::batch_id.eq(&batch_id)))
                    .execute(conn)
                    .into_core()?;
                diesel::delete(import_batches::table.find(&batch_id))
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }

    fn get_saved_mapping(&self, account_id: &str) -> Result<Option<MappingConfig>> {
        let mut conn = get_connection(&self.pool)?;
        account_mappings::table
            .find(account_id)
            .select(account_mappings::mapping)
            .first::<String>(&mut conn)
            .optional()
            .into_core()?
            .map(|json| from_json::<MappingConfig>(&json))
            .transpose()
    }

    async fn save_account_mapping(&self, account_id: &str, mapping: MappingConfig) -> Result<()> {
        let row = AccountMappingDB {
            account_id: account_id.to_string(),
            mapping: to_json(&mapping)?,
            updated_at: chrono::Utc::now().naive_utc(),
        };
        self.writer
            .exec(move |conn| {
                diesel::insert_into(account_mappings::table)
                    .values(&row)
                    .on_conflict(account_mappings::account_id)
                    .do_update()
                    .set((
                        account_mappings::mapping.eq(excluded(account_mappings::mapping)),
                        account_mappings::updated_at.eq(excluded(account_mappings::updated_at)),
                    ))
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestDb;
    use crate::transactions::TransactionRepository;
    use chrono::NaiveDate;
    use ledgerkeep_core::imports::{
        CanonicalField, DecimalFormat, FieldMapping, ImportError, RowIssue, StatementKind,
        StatementSource,
    };
    use ledgerkeep_core::transactions::{
        ReconciliationStatus, TransactionFilter, TransactionRepositoryTrait, TransactionType,
    };
    use rust_decimal_macros::dec;

    fn headers() -> Vec<String> {
        vec!["Date".to_string(), "Narration".to_string(), "Deposits".to_string()]
    }

    fn new_batch(row_count: usize) -> NewImportBatch {
        let rows = (0..row_count)
            .map(|i| {
                RawRow::new(
                    i + 4,
                    &headers(),
                    vec![
                        format!("0{}-04-2024", i + 1),
                        format!("Payment {}", i),
                        "10.00".to_string(),
                    ],
                )
            })
            .collect();
        NewImportBatch {
            account_id: "bank".to_string(),
            file_name: "april.csv".to_string(),
            source: StatementSource {
                kind: StatementKind::Delimited,
                delimiter: Some(",".to_string()),
                encoding: Some("UTF-8".to_string()),
                sheet_name: None,
            },
            headers: headers(),
            header_row_number: 3,
            rows,
        }
    }

    fn mapping() -> MappingConfig {
        MappingConfig {
            field_mapping: FieldMapping::new()
                .with(CanonicalField::Date, "Date")
                .with(CanonicalField::Description, "Narration")
                .with(CanonicalField::Deposits, "Deposits"),
            date_format: "dd-MM-yyyy".to_string(),
            decimal_format: DecimalFormat::Plain,
            strip_currency_symbols: true,
        }
    }

    fn transaction(tx_id: &str, batch_id: &str) -> CanonicalTransaction {
        let now = chrono::Utc::now().naive_utc();
        CanonicalTransaction {
            id: tx_id.to_string(),
            account_id: "bank".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            description: "Payment 0".to_string(),
            payee: None,
            reference_number: None,
            withdrawal: None,
            deposit: Some(dec!(10.00)),
            amount: dec!(10.00),
            transaction_type: TransactionType::Credit,
            raw_row: None,
            import_batch_id: Some(batch_id.to_string()),
            content_hash: format!("hash-{}", tx_id),
            reconciliation_status: ReconciliationStatus::Pending,
            needs_review: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_stores_header_and_rows() {
        let db = TestDb::with_accounts(&["bank"]).await;
        let repo = ImportRepository::new(db.pool.clone(), db.writer.clone());

        let batch = repo.create(new_batch(3)).await.unwrap();
        assert_eq!(batch.status, ImportBatchStatus::Uploaded);
        assert_eq!(batch.total_rows, 3);
        assert_eq!(batch.header_row_number, 3);

        let loaded = repo.get_by_id(&batch.id).unwrap();
        assert_eq!(loaded.headers, headers());
        assert_eq!(loaded.source.delimiter.as_deref(), Some(","));

        let rows = repo.list_rows(&batch.id, Some(2)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number, 4);
        assert_eq!(rows[1].get("Narration"), Some("Payment 1"));
        assert_eq!(repo.list_rows(&batch.id, None).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_large_batch_is_inserted_in_chunks() {
        let db = TestDb::with_accounts(&["bank"]).await;
        let repo = ImportRepository::new(db.pool.clone(), db.writer.clone());
        let batch = repo.create(new_batch(750)).await.unwrap();
        assert_eq!(repo.list_rows(&batch.id, None).unwrap().len(), 750);
    }

    #[tokio::test]
    async fn test_commit_writes_transactions_and_drops_rows() {
        let db = TestDb::with_accounts(&["bank"]).await;
        let repo = ImportRepository::new(db.pool.clone(), db.writer.clone());
        let transactions = TransactionRepository::new(db.pool.clone(), db.writer.clone());

        let batch = repo.create(new_batch(2)).await.unwrap();
        let mapped = repo.save_mapping(&batch.id, mapping()).await.unwrap();
        assert_eq!(mapped.status, ImportBatchStatus::Mapped);
        assert_eq!(mapped.mapping, Some(mapping()));

        let counts = CommitCounts {
            committed: 1,
            skipped: 1,
            duplicate: 0,
            flagged: 0,
            skipped_rows: vec![RowIssue::missing(5, "date")],
        };
        let committed = repo
            .commit_batch(&batch.id, vec![transaction("t1", &batch.id)], counts)
            .await
            .unwrap();
        assert_eq!(committed.status, ImportBatchStatus::Committed);
        assert_eq!(committed.committed_count, 1);
        assert_eq!(committed.skipped_rows[0].row_number, 5);
        assert!(repo.list_rows(&batch.id, None).unwrap().is_empty());

        let stored = transactions
            .list(&TransactionFilter {
                import_batch_id: Some(batch.id.clone()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_committed_batch_cannot_be_failed_or_emptied() {
        let db = TestDb::with_accounts(&["bank"]).await;
        let repo = ImportRepository::new(db.pool.clone(), db.writer.clone());
        let transactions = TransactionRepository::new(db.pool.clone(), db.writer.clone());

        let batch = repo.create(new_batch(1)).await.unwrap();
        repo.save_mapping(&batch.id, mapping()).await.unwrap();
        repo.commit_batch(
            &batch.id,
            vec![transaction("t1", &batch.id)],
            CommitCounts {
                committed: 1,
                skipped: 0,
                duplicate: 0,
                flagged: 0,
                skipped_rows: Vec::new(),
            },
        )
        .await
        .unwrap();

        for err in [
            repo.mark_failed(&batch.id, "late".to_string()).await.unwrap_err(),
            transactions.delete_by_batch(&batch.id).await.unwrap_err(),
        ] {
            assert!(matches!(
                err,
                Error::Import(ImportError::InvalidBatchStatus {
                    status: ImportBatchStatus::Committed,
                    ..
                })
            ));
        }

        let kept = repo.get_by_id(&batch.id).unwrap();
        assert_eq!(kept.status, ImportBatchStatus::Committed);
        assert!(kept.error_message.is_none());
        let stored = transactions
            .list(&TransactionFilter {
                import_batch_id: Some(batch.id.clone()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_commit_writes_nothing() {
        let db = TestDb::with_accounts(&["bank"]).await;
        let repo = ImportRepository::new(db.pool.clone(), db.writer.clone());
        let transactions = TransactionRepository::new(db.pool.clone(), db.writer.clone());

        let batch = repo.create(new_batch(2)).await.unwrap();
        repo.save_mapping(&batch.id, mapping()).await.unwrap();

        // Same id twice violates the primary key on the second insert.
        let err = repo
            .commit_batch(
                &batch.id,
                vec![transaction("t1", &batch.id), transaction("t1", &batch.id)],
                CommitCounts::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));

        assert!(transactions
            .list(&TransactionFilter::default())
            .unwrap()
            .is_empty());
        let batch = repo.get_by_id(&batch.id).unwrap();
        assert_eq!(batch.status, ImportBatchStatus::Mapped);
        assert_eq!(repo.list_rows(&batch.id, None).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_commit_requires_mapped_batch() {
        let db = TestDb::with_accounts(&["bank"]).await;
        let repo = ImportRepository::new(db.pool.clone(), db.writer.clone());
        let batch = repo.create(new_batch(1)).await.unwrap();

        let err = repo
            .commit_batch(&batch.id, Vec::new(), CommitCounts::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Import(ImportError::InvalidBatchStatus { .. })
        ));
    }

    #[tokio::test]
    async fn test_mark_failed_then_delete() {
        let db = TestDb::with_accounts(&["bank"]).await;
        let repo = ImportRepository::new(db.pool.clone(), db.writer.clone());
        let batch = repo.create(new_batch(1)).await.unwrap();

        let failed = repo
            .mark_failed(&batch.id, "disk I/O error".to_string())
            .await
            .unwrap();
        assert_eq!(failed.status, ImportBatchStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("disk I/O error"));

        repo.delete(&batch.id).await.unwrap();
        assert!(repo.get_by_id(&batch.id).unwrap_err().is_not_found());
        assert!(repo.list(Some("bank")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let db = TestDb::with_accounts(&["bank"]).await;
        let repo = ImportRepository::new(db.pool.clone(), db.writer.clone());
        let first = repo.create(new_batch(1)).await.unwrap();
        let second = repo.create(new_batch(1)).await.unwrap();

        let ids: Vec<_> = repo.list(None).unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert!(repo.list(Some("other")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_saved_mapping_upserts() {
        let db = TestDb::with_accounts(&["bank"]).await;
        let repo = ImportRepository::new(db.pool.clone(), db.writer.clone());
        assert!(repo.get_saved_mapping("bank").unwrap().is_none());

        repo.save_account_mapping("bank", mapping()).await.unwrap();
        let changed = MappingConfig {
            strip_currency_symbols: false,
            ..mapping()
        };
        repo.save_account_mapping("bank", changed.clone())
            .await
            .unwrap();
        assert_eq!(repo.get_saved_mapping("bank").unwrap(), Some(changed));
    }
}
