use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::Arc;

use super::field_mapping::{resolve, MappingConfig};
use super::imports_errors::ImportError;
use super::imports_model::{
    CommitCounts, ImportBatch, ImportBatchStatus, ImportPreview, ImportSummary, MappedPreview,
    NewImportBatch, RawRow, RowIssue,
};
use super::imports_traits::{ImportRepositoryTrait, ImportServiceTrait};
use super::mapping_suggestion::suggest_mapping;
use super::materializer::materialize_rows;
use super::statement_reader::{read_statement, ReadLimits};
use crate::accounts::AccountServiceTrait;
use crate::errors::{Error, Result};
use crate::locks::{LockModule, LockServiceTrait};
use crate::settings::LedgerSettings;
use crate::transactions::{CanonicalTransaction, TransactionCandidate, TransactionRepositoryTrait};

/// Service driving a statement from upload to committed transactions.
pub struct ImportService {
    repository: Arc<dyn ImportRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    account_service: Arc<dyn AccountServiceTrait>,
    lock_service: Arc<dyn LockServiceTrait>,
    settings: LedgerSettings,
}

impl ImportService {
    pub fn new(
        repository: Arc<dyn ImportRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        account_service: Arc<dyn AccountServiceTrait>,
        lock_service: Arc<dyn LockServiceTrait>,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            repository,
            transaction_repository,
            account_service,
            lock_service,
            settings,
        }
    }

    /// Stored mapping first, then the account's saved mapping if the headers
    /// still fit, then the header heuristics.
    fn suggest_for(&self, batch: &ImportBatch, sample: &[RawRow]) -> Result<Option<MappingConfig>> {
        if batch.status == ImportBatchStatus::Committed {
            return Ok(None);
        }
        if let Some(mapping) = &batch.mapping {
            return Ok(Some(mapping.clone()));
        }
        if let Some(saved) = self.repository.get_saved_mapping(&batch.account_id)? {
            if saved.fits_headers(&batch.headers) {
                debug!("Offering saved mapping for account {}", batch.account_id);
                return Ok(Some(saved));
            }
        }
        Ok(Some(suggest_mapping(&batch.headers, sample)))
    }

    fn build_preview(&self, batch: ImportBatch) -> Result<ImportPreview> {
        let sample_rows = self
            .repository
            .list_rows(&batch.id, Some(self.settings.preview_rows))?;
        let suggested_mapping = self.suggest_for(&batch, &sample_rows)?;
        Ok(ImportPreview {
            batch,
            sample_rows,
            suggested_mapping,
        })
    }

    /// Moves candidates dated inside a locked Banking period to the issues.
    fn apply_lock_gate(
        &self,
        candidates: Vec<TransactionCandidate>,
        issues: &mut Vec<RowIssue>,
    ) -> Result<Vec<TransactionCandidate>> {
        let mut open = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match self
                .lock_service
                .ensure_mutation_allowed(LockModule::Banking, candidate.date)
            {
                Ok(()) => open.push(candidate),
                Err(Error::Lock(e)) => {
                    warn!("Row {} skipped: {}", candidate.row_number, e);
                    issues.push(RowIssue {
                        row_number: candidate.row_number,
                        field: Some("date".to_string()),
                        raw_value: Some(candidate.date.to_string()),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(open)
    }

    async fn roll_back(&self, batch_id: &str, cause: &Error) -> Error {
        error!("Commit of import batch {} failed: {}", batch_id, cause);
        match self.transaction_repository.delete_by_batch(batch_id).await {
            Ok(0) => {}
            Ok(removed) => warn!(
                "Removed {} partially written transactions of batch {}",
                removed, batch_id
            ),
            Err(e) => error!("Rollback of batch {} failed: {}", batch_id, e),
        }
        if let Err(e) = self
            .repository
            .mark_failed(batch_id, cause.to_string())
            .await
        {
            error!("Could not mark batch {} failed: {}", batch_id, e);
        }
        Error::Import(ImportError::ImportFailed(cause.to_string()))
    }
}

#[async_trait]
impl ImportServiceTrait for ImportService {
    async fn upload(
        &self,
        account_id: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<ImportPreview> {
        let account = self.account_service.get_account(account_id)?;
        if !account.is_active || !account.account_type.accepts_statements() {
            return Err(ImportError::AccountNotImportable(account_id.to_string()).into());
        }

        let parsed = read_statement(
            content,
            ReadLimits {
                header_scan_rows: self.settings.header_scan_rows,
                max_rows: self.settings.max_import_rows,
            },
        )?;
        debug!(
            "Read '{}': {} data rows below header row {}",
            file_name,
            parsed.rows.len(),
            parsed.header_row_number
        );

        let batch = self
            .repository
            .create(NewImportBatch {
                account_id: account_id.to_string(),
                file_name: file_name.to_string(),
                source: parsed.source,
                headers: parsed.headers,
                header_row_number: parsed.header_row_number,
                rows: parsed.rows,
            })
            .await?;
        info!(
            "Import batch {} uploaded for account {} ({} rows)",
            batch.id, account_id, batch.total_rows
        );
        self.build_preview(batch)
    }

    fn get_batch(&self, batch_id: &str) -> Result<ImportBatch> {
        self.repository.get_by_id(batch_id)
    }

    fn list_batches(&self, account_id: Option<&str>) -> Result<Vec<ImportBatch>> {
        self.repository.list(account_id)
    }

    fn preview(&self, batch_id: &str) -> Result<ImportPreview> {
        let batch = self.repository.get_by_id(batch_id)?;
        self.build_preview(batch)
    }

    async fn apply_mapping(&self, batch_id: &str, mapping: MappingConfig) -> Result<ImportBatch> {
        let batch = self.repository.get_by_id(batch_id)?;
        batch.ensure_status(&[ImportBatchStatus::Uploaded, ImportBatchStatus::Mapped])?;
        resolve(&batch.headers, &mapping)?;

        let batch = self.repository.save_mapping(batch_id, mapping).await?;
        info!("Import batch {} mapped", batch_id);
        Ok(batch)
    }

    fn mapped_preview(&self, batch_id: &str, limit: Option<usize>) -> Result<MappedPreview> {
        let batch = self.repository.get_by_id(batch_id)?;
        batch.ensure_status(&[ImportBatchStatus::Mapped])?;
        let mapping = batch.mapping.as_ref().ok_or_else(|| {
            ImportError::IncompleteMapping("batch has no mapping".to_string())
        })?;
        let extractor = resolve(&batch.headers, mapping)?;

        let limit = limit.unwrap_or(self.settings.preview_rows);
        let rows = self.repository.list_rows(batch_id, Some(limit))?;
        let (candidates, issues) = materialize_rows(&extractor, &batch.account_id, &rows);
        Ok(MappedPreview {
            batch_id: batch.id,
            candidates,
            issues,
        })
    }

    async fn commit(&self, batch_id: &str) -> Result<ImportSummary> {
        let batch = self.repository.get_by_id(batch_id)?;
        batch.ensure_status(&[ImportBatchStatus::Mapped])?;
        let mapping = batch.mapping.clone().ok_or_else(|| {
            ImportError::IncompleteMapping("batch has no mapping".to_string())
        })?;
        let extractor = resolve(&batch.headers, &mapping)?;

        let rows = self.repository.list_rows(batch_id, None)?;
        let total = rows.len();
        let (candidates, mut issues) = materialize_rows(&extractor, &batch.account_id, &rows);
        let candidates = self.apply_lock_gate(candidates, &mut issues)?;

        let hashes: Vec<String> = candidates.iter().map(|c| c.content_hash.clone()).collect();
        let existing = self
            .transaction_repository
            .find_existing_hashes(&batch.account_id, &hashes)?;

        let mut seen = HashSet::new();
        let mut duplicate_rows = Vec::new();
        let mut fresh = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if existing.contains(&candidate.content_hash)
                || !seen.insert(candidate.content_hash.clone())
            {
                duplicate_rows.push(candidate.row_number);
            } else {
                fresh.push(candidate);
            }
        }

        issues.sort_by_key(|issue| issue.row_number);
        let flagged_rows: Vec<usize> = fresh
            .iter()
            .filter(|c| c.needs_review)
            .map(|c| c.row_number)
            .collect();
        let counts = CommitCounts {
            committed: fresh.len(),
            skipped: issues.len(),
            duplicate: duplicate_rows.len(),
            flagged: flagged_rows.len(),
            skipped_rows: issues,
        };
        debug_assert_eq!(counts.committed + counts.skipped + counts.duplicate, total);

        let now = Utc::now().naive_utc();
        let transactions: Vec<CanonicalTransaction> = fresh
            .into_iter()
            .map(|c| CanonicalTransaction::from_candidate(c, &batch.account_id, batch_id, now))
            .collect();

        let committed = match self
            .repository
            .commit_batch(batch_id, transactions, counts)
            .await
        {
            Ok(batch) => batch,
            Err(e @ Error::Database(_)) => return Err(self.roll_back(batch_id, &e).await),
            Err(e) => return Err(e),
        };
        info!(
            "Import batch {} committed: {} new, {} duplicate, {} skipped",
            batch_id,
            committed.committed_count,
            committed.duplicate_count,
            committed.skipped_count
        );

        if let Err(e) = self
            .repository
            .save_account_mapping(&committed.account_id, mapping)
            .await
        {
            warn!(
                "Could not remember mapping for account {}: {}",
                committed.account_id, e
            );
        }

        Ok(ImportSummary {
            batch: committed,
            duplicate_rows,
            flagged_rows,
        })
    }

    async fn discard(&self, batch_id: &str) -> Result<()> {
        let batch = self.repository.get_by_id(batch_id)?;
        if !batch.status.can_discard() {
            return Err(ImportError::InvalidBatchStatus {
                status: batch.status,
                expected: "uploaded, mapped or failed".to_string(),
            }
            .into());
        }
        self.repository.delete(batch_id).await?;
        info!("Import batch {} discarded", batch_id);
        Ok(())
    }
}
