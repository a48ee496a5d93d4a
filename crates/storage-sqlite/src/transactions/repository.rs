use async_trait::async_trait;
use diesel::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::{import_batches, transactions};
use crate::utils::chunk_for_sqlite;

use super::model::TransactionDB;
use ledgerkeep_core::imports::{ImportBatchStatus, ImportError};
use ledgerkeep_core::transactions::{
    CanonicalTransaction, TransactionFilter, TransactionRepositoryTrait,
};
use ledgerkeep_core::{Error, Result};

pub struct TransactionRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl TransactionRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl TransactionRepositoryTrait for TransactionRepository {
    fn get_by_id(&self, transaction_id: &str) -> Result<CanonicalTransaction> {
        let mut conn = get_connection(&self.pool)?;
        transactions::table
            .find(transaction_id)
            .select(TransactionDB::as_select())
            .first::<TransactionDB>(&mut conn)
            .optional()
            .into_core()?
            .ok_or_else(|| Error::not_found("Transaction", transaction_id))
            .and_then(CanonicalTransaction::try_from)
    }

    /// Matching transactions, oldest first.
    fn list(&self, filter: &TransactionFilter) -> Result<Vec<CanonicalTransaction>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = transactions::table.into_boxed();

        if let Some(account_id) = &filter.account_id {
            query = query.filter(transactions::account_id.eq(account_id));
        }
        if let Some(batch_id) = &filter.import_batch_id {
            query = query.filter(transactions::import_batch_id.eq(batch_id));
        }
        if let Some(status) = filter.reconciliation_status {
            query = query.filter(transactions::reconciliation_status.eq(status.as_str()));
        }
        if let Some(start) = filter.start_date {
            query = query.filter(transactions::date.ge(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(transactions::date.le(end));
        }

        query
            .select(TransactionDB::as_select())
            .order((
                transactions::date.asc(),
                transactions::created_at.asc(),
                transactions::id.asc(),
            ))
            .load::<TransactionDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(CanonicalTransaction::try_from)
            .collect()
    }

    fn find_existing_hashes(
        &self,
        account_id: &str,
        hashes: &[String],
    ) -> Result<HashSet<String>> {
        let mut conn = get_connection(&self.pool)?;
        let mut found = HashSet::new();
        for chunk in chunk_for_sqlite(hashes) {
            let existing = transactions::table
                .filter(transactions::account_id.eq(account_id))
                .filter(transactions::content_hash.eq_any(chunk))
                .select(transactions::content_hash)
                .load::<String>(&mut conn)
                .into_core()?;
            found.extend(existing);
        }
        Ok(found)
    }

    async fn create(&self, transaction: CanonicalTransaction) -> Result<CanonicalTransaction> {
        let row = TransactionDB::from_domain(&transaction)?;
        self.writer
            .exec(move |conn| {
                diesel::insert_into(transactions::table)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                Ok(transaction)
            })
            .await
    }

    async fn update(&self, transaction: CanonicalTransaction) -> Result<CanonicalTransaction> {
        let row = TransactionDB::from_domain(&transaction)?;
        self.writer
            .exec(move |conn| {
                let affected = diesel::update(transactions::table.find(&row.id))
                    .set(&row)
                    .execute(conn)
                    .into_core()?;
                if affected == 0 {
                    return Err(Error::not_found("Transaction", row.id.clone()));
                }
                Ok(transaction)
            })
            .await
    }

    async fn delete(&self, transaction_id: &str) -> Result<()> {
        let transaction_id = transaction_id.to_string();
        self.writer
            .exec(move |conn| {
                diesel::delete(transactions::table.find(&transaction_id))
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }

    async fn delete_by_batch(&self, import_batch_id: &str) -> Result<usize> {
        let import_batch_id = import_batch_id.to_string();
        self.writer
            .exec(move |conn| {
                let status: Option<String> = import_batches::table
                    .find(&import_batch_id)
                    .select(import_batches::status)
                    .first(conn)
                    .optional()
                    .into_core()?;
                if let Some(status) = status {
                    let status = status.parse::<ImportBatchStatus>()?;
                    if status == ImportBatchStatus::Committed {
                        return Err(ImportError::InvalidBatchStatus {
                            status,
                            expected: "uploaded or mapped or failed".to_string(),
                        }
                        .into());
                    }
                }
                diesel::delete(
                    transactions::table
                        .filter(transactions::import_batch_id.eq(&import_batch_id)),
                )
                .execute(conn)
                .into_core()
            })
            .await
    }
}
