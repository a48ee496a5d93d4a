//! Transaction repository and service traits.

use async_trait::async_trait;
use std::collections::HashSet;

use super::transactions_model::{
    CanonicalTransaction, NewTransaction, TransactionFilter, TransactionUpdate,
};
use crate::errors::Result;

/// Storage contract for canonical transactions.
#[async_trait]
pub trait TransactionRepositoryTrait: Send + Sync {
    fn get_by_id(&self, transaction_id: &str) -> Result<CanonicalTransaction>;

    fn list(&self, filter: &TransactionFilter) -> Result<Vec<CanonicalTransaction>>;

    /// Subset of `hashes` already stored for `account_id`.
    fn find_existing_hashes(&self, account_id: &str, hashes: &[String])
        -> Result<HashSet<String>>;

    async fn create(&self, transaction: CanonicalTransaction) -> Result<CanonicalTransaction>;

    async fn update(&self, transaction: CanonicalTransaction) -> Result<CanonicalTransaction>;

    async fn delete(&self, transaction_id: &str) -> Result<()>;

    /// Removes every transaction written for an import batch. Used to roll
    /// back a commit that did not complete.
    async fn delete_by_batch(&self, import_batch_id: &str) -> Result<usize>;
}

#[async_trait]
pub trait TransactionServiceTrait: Send + Sync {
    fn get_transaction(&self, transaction_id: &str) -> Result<CanonicalTransaction>;

    fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<CanonicalTransaction>>;

    /// Records a hand-entered transaction. Lock-gated on its date.
    async fn create_transaction(&self, new: NewTransaction) -> Result<CanonicalTransaction>;

    /// Replaces the editable fields. Lock-gated on both the old and new date.
    async fn update_transaction(
        &self,
        transaction_id: &str,
        update: TransactionUpdate,
    ) -> Result<CanonicalTransaction>;

    async fn delete_transaction(&self, transaction_id: &str) -> Result<()>;

    /// Marks a transaction reconciled. Reconciling twice is a no-op.
    async fn reconcile_transaction(&self, transaction_id: &str) -> Result<CanonicalTransaction>;

    /// Marks a pending transaction cancelled. Cancelling twice is a no-op.
    async fn cancel_transaction(&self, transaction_id: &str) -> Result<CanonicalTransaction>;
}
