use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::{debug, error, info};
use std::sync::Arc;

use super::balancing::{ensure_postable, mirror_lines, validate_lines};
use super::journal_errors::JournalError;
use super::journal_model::{
    EntrySource, EntryStatus, JournalEntry, JournalEntryUpdate, JournalFilter, LineItem,
    NewJournalEntry, ReverseRequest, TransactionEntryRequest,
};
use super::journal_traits::{JournalRepositoryTrait, JournalServiceTrait};
use crate::accounts::AccountServiceTrait;
use crate::errors::{Error, Result, ValidationError};
use crate::locks::{LockModule, LockServiceTrait};
use crate::settings::LedgerSettings;
use crate::transactions::{ReconciliationStatus, TransactionServiceTrait, TransactionType};

/// Journal entries are frozen by the Accountant lock.
const LOCK_MODULE: LockModule = LockModule::Accountant;

/// Service for the draft → posted → reversed lifecycle of journal entries.
pub struct JournalService {
    repository: Arc<dyn JournalRepositoryTrait>,
    account_service: Arc<dyn AccountServiceTrait>,
    transaction_service: Arc<dyn TransactionServiceTrait>,
    lock_service: Arc<dyn LockServiceTrait>,
    settings: LedgerSettings,
}

impl JournalService {
    pub fn new(
        repository: Arc<dyn JournalRepositoryTrait>,
        account_service: Arc<dyn AccountServiceTrait>,
        transaction_service: Arc<dyn TransactionServiceTrait>,
        lock_service: Arc<dyn LockServiceTrait>,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            repository,
            account_service,
            transaction_service,
            lock_service,
            settings,
        }
    }

    fn ensure_open(&self, date: NaiveDate) -> Result<()> {
        self.lock_service.ensure_mutation_allowed(LOCK_MODULE, date)
    }

    fn ensure_accounts_exist(&self, lines: &[LineItem]) -> Result<()> {
        let ids: Vec<String> = lines.iter().map(|l| l.account_id.clone()).collect();
        let missing = self.account_service.find_missing_accounts(&ids)?;
        if missing.is_empty() {
            Ok(())
        } else {
            Err(JournalError::InvalidAccount(missing).into())
        }
    }

    fn check_lines(&self, lines: &[LineItem]) -> Result<()> {
        validate_lines(lines)?;
        self.ensure_accounts_exist(lines)
    }

    fn build_draft(new_entry: NewJournalEntry) -> JournalEntry {
        let now = Utc::now().naive_utc();
        let mut entry = JournalEntry {
            id: uuid::Uuid::now_v7().to_string(),
            entry_number: String::new(),
            date: new_entry.date,
            description: new_entry.description.trim().to_string(),
            reference: new_entry
                .reference
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            source: new_entry.source,
            status: EntryStatus::Draft,
            currency: new_entry.currency.trim().to_uppercase(),
            line_items: new_entry.line_items,
            total_debit: Default::default(),
            total_credit: Default::default(),
            reversal_of: None,
            reversed_by: None,
            reversal_reason: None,
            version: 1,
            posted_at: None,
            created_at: now,
            updated_at: now,
        };
        entry.refresh_totals();
        entry
    }

    /// Full posting checks on a stored draft, without writing.
    fn check_postable(&self, entry: &JournalEntry) -> Result<()> {
        entry.ensure_draft("post")?;
        ensure_postable(&entry.line_items, self.settings.balance_tolerance)?;
        self.ensure_accounts_exist(&entry.line_items)?;
        self.ensure_open(entry.date)
    }
}

#[async_trait]
impl JournalServiceTrait for JournalService {
    fn get_entry(&self, entry_id: &str) -> Result<JournalEntry> {
        self.repository.get_by_id(entry_id)
    }

    fn list_entries(&self, filter: &JournalFilter) -> Result<Vec<JournalEntry>> {
        self.repository.list(filter)
    }

    async fn create_draft(&self, new_entry: NewJournalEntry) -> Result<JournalEntry> {
        new_entry.validate()?;
        self.check_lines(&new_entry.line_items)?;
        self.ensure_open(new_entry.date)?;

        let draft = Self::build_draft(new_entry);
        debug!("Creating {} journal draft dated {}", draft.source, draft.date);
        self.repository
            .create(draft, &self.settings.entry_number_prefix)
            .await
    }

    async fn update_draft(
        &self,
        entry_id: &str,
        update: JournalEntryUpdate,
    ) -> Result<JournalEntry> {
        update.validate()?;
        let mut entry = self.repository.get_by_id(entry_id)?;
        entry.ensure_draft("edit")?;
        if entry.version != update.version {
            return Err(JournalError::ConcurrentUpdate(entry_id.to_string()).into());
        }
        self.check_lines(&update.line_items)?;
        self.ensure_open(entry.date)?;
        if update.date != entry.date {
            self.ensure_open(update.date)?;
        }

        entry.date = update.date;
        entry.description = update.description.trim().to_string();
        entry.reference = update
            .reference
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        entry.currency = update.currency.trim().to_uppercase();
        entry.line_items = update.line_items;
        entry.refresh_totals();
        entry.updated_at = Utc::now().naive_utc();

        self.repository.update_draft(entry, update.version).await
    }

    async fn delete_draft(&self, entry_id: &str) -> Result<()> {
        let entry = self.repository.get_by_id(entry_id)?;
        entry.ensure_draft("delete")?;
        self.ensure_open(entry.date)?;
        self.repository.delete_draft(entry_id).await?;
        info!("Deleted journal draft {}", entry.entry_number);
        Ok(())
    }

    async fn post_entry(&self, entry_id: &str) -> Result<JournalEntry> {
        let entry = self.repository.get_by_id(entry_id)?;
        self.check_postable(&entry)?;

        let posted = self
            .repository
            .post(
                entry_id,
                entry.version,
                self.settings.balance_tolerance,
                Utc::now().naive_utc(),
            )
            .await?;
        info!(
            "Posted journal entry {} ({} {})",
            posted.entry_number, posted.total_debit, posted.currency
        );
        Ok(posted)
    }

    async fn reverse_entry(
        &self,
        entry_id: &str,
        request: ReverseRequest,
    ) -> Result<JournalEntry> {
        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(JournalError::MissingReason.into());
        }
        let original = self.repository.get_by_id(entry_id)?;
        original.ensure_reversible()?;
        self.ensure_open(original.date)?;
        let date = request.date.unwrap_or(original.date);
        self.ensure_open(date)?;

        let now = Utc::now().naive_utc();
        let mut mirror = JournalEntry {
            id: uuid::Uuid::now_v7().to_string(),
            entry_number: String::new(),
            date,
            description: format!("Reversal of {}: {}", original.entry_number, reason),
            reference: Some(original.entry_number.clone()),
            source: original.source,
            status: EntryStatus::Posted,
            currency: original.currency.clone(),
            line_items: mirror_lines(&original.line_items),
            total_debit: Default::default(),
            total_credit: Default::default(),
            reversal_of: Some(original.id.clone()),
            reversed_by: None,
            reversal_reason: Some(reason.to_string()),
            version: 1,
            posted_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        mirror.refresh_totals();
        ensure_postable(&mirror.line_items, self.settings.balance_tolerance)?;

        let mirror = self
            .repository
            .reverse(
                entry_id,
                original.version,
                mirror,
                &self.settings.entry_number_prefix,
            )
            .await?;
        info!(
            "Reversed journal entry {} with {}",
            original.entry_number, mirror.entry_number
        );
        Ok(mirror)
    }

    async fn record_system_entry(&self, new_entry: NewJournalEntry) -> Result<JournalEntry> {
        if new_entry.source == EntrySource::Manual {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "System entries need a non-manual source".to_string(),
            )));
        }
        new_entry.validate()?;
        ensure_postable(&new_entry.line_items, self.settings.balance_tolerance)?;
        self.ensure_accounts_exist(&new_entry.line_items)?;
        self.ensure_open(new_entry.date)?;

        let draft = self
            .repository
            .create(
                Self::build_draft(new_entry),
                &self.settings.entry_number_prefix,
            )
            .await?;
        match self
            .repository
            .post(
                &draft.id,
                draft.version,
                self.settings.balance_tolerance,
                Utc::now().naive_utc(),
            )
            .await
        {
            Ok(posted) => {
                info!(
                    "Recorded {} entry {}",
                    posted.source, posted.entry_number
                );
                Ok(posted)
            }
            Err(e) => {
                error!("Posting system entry {} failed: {}", draft.entry_number, e);
                if let Err(cleanup) = self.repository.delete_draft(&draft.id).await {
                    error!("Could not remove draft {}: {}", draft.entry_number, cleanup);
                }
                Err(e)
            }
        }
    }

    async fn draft_from_transaction(
        &self,
        request: TransactionEntryRequest,
    ) -> Result<JournalEntry> {
        let tx = self
            .transaction_service
            .get_transaction(&request.transaction_id)?;
        if tx.reconciliation_status == ReconciliationStatus::Cancelled {
            return Err(Error::ConstraintViolation(format!(
                "Transaction '{}' is cancelled",
                tx.id
            )));
        }
        let bank = self.account_service.get_account(&tx.account_id)?;

        let amount = tx.amount.abs();
        let contra = request.contra_account_id;
        let line_items = match tx.transaction_type {
            TransactionType::Credit => vec![
                LineItem::debit(tx.account_id.clone(), amount),
                LineItem::credit(contra, amount),
            ],
            TransactionType::Debit => vec![
                LineItem::debit(contra, amount),
                LineItem::credit(tx.account_id.clone(), amount),
            ],
        };

        let description = request
            .description
            .into_iter()
            .chain(std::iter::once(tx.description))
            .find(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("Bank transaction on {}", tx.date));

        self.create_draft(NewJournalEntry {
            date: tx.date,
            description,
            reference: tx.reference_number.or(Some(tx.id)),
            source: EntrySource::Import,
            currency: bank.currency,
            line_items,
        })
        .await
    }
}
