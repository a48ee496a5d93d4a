//! Import batch repository and service traits.

use async_trait::async_trait;

use super::field_mapping::MappingConfig;
use super::imports_model::{
    CommitCounts, ImportBatch, ImportPreview, ImportSummary, MappedPreview, NewImportBatch, RawRow,
};
use crate::errors::Result;
use crate::transactions::CanonicalTransaction;

/// Storage contract for import batches and their raw rows.
#[async_trait]
pub trait ImportRepositoryTrait: Send + Sync {
    /// Persists a batch in `uploaded` status together with its raw rows.
    async fn create(&self, new_batch: NewImportBatch) -> Result<ImportBatch>;

    fn get_by_id(&self, batch_id: &str) -> Result<ImportBatch>;

    /// Batches newest first, optionally for one account.
    fn list(&self, account_id: Option<&str>) -> Result<Vec<ImportBatch>>;

    /// Raw rows in file order. Empty once the batch is committed.
    fn list_rows(&self, batch_id: &str, limit: Option<usize>) -> Result<Vec<RawRow>>;

    /// Stores the mapping and moves the batch to `mapped`.
    async fn save_mapping(&self, batch_id: &str, mapping: MappingConfig) -> Result<ImportBatch>;

    /// Inserts `transactions`, writes the final counts, marks the batch
    /// `committed` and drops its raw rows. All or nothing.
    async fn commit_batch(
        &self,
        batch_id: &str,
        transactions: Vec<CanonicalTransaction>,
        counts: CommitCounts,
    ) -> Result<ImportBatch>;

    async fn mark_failed(&self, batch_id: &str, message: String) -> Result<ImportBatch>;

    /// Removes the batch and its raw rows.
    async fn delete(&self, batch_id: &str) -> Result<()>;

    /// Mapping last committed for the account, if any.
    fn get_saved_mapping(&self, account_id: &str) -> Result<Option<MappingConfig>>;

    async fn save_account_mapping(&self, account_id: &str, mapping: MappingConfig) -> Result<()>;
}

#[async_trait]
pub trait ImportServiceTrait: Send + Sync {
    /// Reads a statement file and opens an `uploaded` batch for it.
    async fn upload(&self, account_id: &str, file_name: &str, content: &[u8])
        -> Result<ImportPreview>;

    fn get_batch(&self, batch_id: &str) -> Result<ImportBatch>;

    fn list_batches(&self, account_id: Option<&str>) -> Result<Vec<ImportBatch>>;

    /// Sample rows and mapping suggestion for an existing batch.
    fn preview(&self, batch_id: &str) -> Result<ImportPreview>;

    /// Validates `mapping` against the batch headers and stores it.
    async fn apply_mapping(&self, batch_id: &str, mapping: MappingConfig) -> Result<ImportBatch>;

    /// Materializes the first rows under the stored mapping without writing.
    fn mapped_preview(&self, batch_id: &str, limit: Option<usize>) -> Result<MappedPreview>;

    /// Turns every row into a transaction, skipping duplicates and invalid
    /// rows, and commits the batch.
    async fn commit(&self, batch_id: &str) -> Result<ImportSummary>;

    /// Deletes a batch that was never committed.
    async fn discard(&self, batch_id: &str) -> Result<()>;
}
