use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

use super::accounts_model::{Account, NewAccount};
use super::accounts_traits::{AccountRepositoryTrait, AccountServiceTrait};
use crate::errors::Result;

/// Service for managing accounts
pub struct AccountService {
    repository: Arc<dyn AccountRepositoryTrait>,
}

impl AccountService {
    /// Creates a new AccountService instance
    pub fn new(repository: Arc<dyn AccountRepositoryTrait>) -> Self {
        Self { repository }
    }
}

#[async_trait::async_trait]
impl AccountServiceTrait for AccountService {
    async fn create_account(&self, new_account: NewAccount) -> Result<Account> {
        new_account.validate()?;
        debug!(
            "Creating {} account '{}' in {}",
            new_account.account_type, new_account.name, new_account.currency
        );
        let mut new_account = new_account;
        new_account.currency = new_account.currency.trim().to_uppercase();
        self.repository.create(new_account).await
    }

    fn get_account(&self, account_id: &str) -> Result<Account> {
        self.repository.get_by_id(account_id)
    }

    fn list_accounts(
        &self,
        is_active_filter: Option<bool>,
        account_ids: Option<&[String]>,
    ) -> Result<Vec<Account>> {
        self.repository.list(is_active_filter, account_ids)
    }

    fn find_missing_accounts(&self, account_ids: &[String]) -> Result<Vec<String>> {
        if account_ids.is_empty() {
            return Ok(Vec::new());
        }
        let existing: HashSet<String> = self
            .repository
            .list(None, Some(account_ids))?
            .into_iter()
            .map(|a| a.id)
            .collect();

        let mut seen = HashSet::new();
        Ok(account_ids
            .iter()
            .filter(|id| !existing.contains(*id) && seen.insert((*id).clone()))
            .cloned()
            .collect())
    }
}
