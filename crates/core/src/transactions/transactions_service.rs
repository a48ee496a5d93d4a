use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use std::sync::Arc;

use super::transactions_model::{
    derive_amount, CanonicalTransaction, NewTransaction, ReconciliationStatus, TransactionFilter,
    TransactionUpdate,
};
use super::transactions_traits::{TransactionRepositoryTrait, TransactionServiceTrait};
use crate::accounts::AccountServiceTrait;
use crate::errors::{Error, Result};
use crate::imports::compute_content_hash;
use crate::locks::{LockModule, LockServiceTrait};

/// Bank transactions are frozen by the Banking lock.
const LOCK_MODULE: LockModule = LockModule::Banking;

/// Service for manual edits and reconciliation of canonical transactions.
pub struct TransactionService {
    repository: Arc<dyn TransactionRepositoryTrait>,
    account_service: Arc<dyn AccountServiceTrait>,
    lock_service: Arc<dyn LockServiceTrait>,
}

impl TransactionService {
    pub fn new(
        repository: Arc<dyn TransactionRepositoryTrait>,
        account_service: Arc<dyn AccountServiceTrait>,
        lock_service: Arc<dyn LockServiceTrait>,
    ) -> Self {
        Self {
            repository,
            account_service,
            lock_service,
        }
    }

    fn ensure_editable(tx: &CanonicalTransaction) -> Result<()> {
        if tx.reconciliation_status == ReconciliationStatus::Pending {
            return Ok(());
        }
        Err(Error::ConstraintViolation(format!(
            "Transaction '{}' is {} and can no longer be changed",
            tx.id, tx.reconciliation_status
        )))
    }

    async fn set_status(
        &self,
        transaction_id: &str,
        target: ReconciliationStatus,
    ) -> Result<CanonicalTransaction> {
        let mut tx = self.repository.get_by_id(transaction_id)?;
        if tx.reconciliation_status == target {
            debug!("Transaction {} already {}", transaction_id, target);
            return Ok(tx);
        }
        Self::ensure_editable(&tx)?;
        self.lock_service
            .ensure_mutation_allowed(LOCK_MODULE, tx.date)?;

        tx.reconciliation_status = target;
        tx.updated_at = Utc::now().naive_utc();
        let saved = self.repository.update(tx).await?;
        info!("Transaction {} marked {}", transaction_id, target);
        Ok(saved)
    }
}

#[async_trait]
impl TransactionServiceTrait for TransactionService {
    fn get_transaction(&self, transaction_id: &str) -> Result<CanonicalTransaction> {
        self.repository.get_by_id(transaction_id)
    }

    fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<CanonicalTransaction>> {
        self.repository.list(filter)
    }

    async fn create_transaction(&self, new: NewTransaction) -> Result<CanonicalTransaction> {
        new.validate()?;
        self.account_service.get_account(&new.account_id)?;
        self.lock_service
            .ensure_mutation_allowed(LOCK_MODULE, new.date)?;

        let (amount, transaction_type) = derive_amount(new.withdrawal, new.deposit)?;
        let description = new.description.trim().to_string();
        let reference_number = new
            .reference_number
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let content_hash = compute_content_hash(
            &new.account_id,
            new.date,
            &description,
            amount,
            reference_number.as_deref(),
        );
        let now = Utc::now().naive_utc();

        let tx = CanonicalTransaction {
            id: uuid::Uuid::now_v7().to_string(),
            account_id: new.account_id,
            date: new.date,
            description,
            payee: new.payee.filter(|p| !p.trim().is_empty()),
            reference_number,
            withdrawal: new.withdrawal.filter(|w| !w.is_zero()),
            deposit: new.deposit.filter(|d| !d.is_zero()),
            amount,
            transaction_type,
            raw_row: None,
            import_batch_id: None,
            content_hash,
            reconciliation_status: ReconciliationStatus::Pending,
            needs_review: false,
            created_at: now,
            updated_at: now,
        };
        debug!("Creating manual transaction for account {}", tx.account_id);
        self.repository.create(tx).await
    }

    async fn update_transaction(
        &self,
        transaction_id: &str,
        update: TransactionUpdate,
    ) -> Result<CanonicalTransaction> {
        update.validate()?;
        let mut tx = self.repository.get_by_id(transaction_id)?;
        Self::ensure_editable(&tx)?;
        self.lock_service
            .ensure_mutation_allowed(LOCK_MODULE, tx.date)?;
        if update.date != tx.date {
            self.lock_service
                .ensure_mutation_allowed(LOCK_MODULE, update.date)?;
        }

        let (amount, transaction_type) = derive_amount(update.withdrawal, update.deposit)?;
        tx.date = update.date;
        tx.description = update.description.trim().to_string();
        tx.payee = update.payee.filter(|p| !p.trim().is_empty());
        tx.reference_number = update
            .reference_number
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        tx.withdrawal = update.withdrawal.filter(|w| !w.is_zero());
        tx.deposit = update.deposit.filter(|d| !d.is_zero());
        tx.amount = amount;
        tx.transaction_type = transaction_type;
        tx.content_hash = compute_content_hash(
            &tx.account_id,
            tx.date,
            &tx.description,
            tx.amount,
            tx.reference_number.as_deref(),
        );
        tx.needs_review = false;
        tx.updated_at = Utc::now().naive_utc();

        self.repository.update(tx).await
    }

    async fn delete_transaction(&self, transaction_id: &str) -> Result<()> {
        let tx = self.repository.get_by_id(transaction_id)?;
        Self::ensure_editable(&tx)?;
        self.lock_service
            .ensure_mutation_allowed(LOCK_MODULE, tx.date)?;
        self.repository.delete(transaction_id).await?;
        info!("Deleted transaction {}", transaction_id);
        Ok(())
    }

    async fn reconcile_transaction(&self, transaction_id: &str) -> Result<CanonicalTransaction> {
        self.set_status(transaction_id, ReconciliationStatus::Reconciled)
            .await
    }

    async fn cancel_transaction(&self, transaction_id: &str) -> Result<CanonicalTransaction> {
        self.set_status(transaction_id, ReconciliationStatus::Cancelled)
            .await
    }
}
