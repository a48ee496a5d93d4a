use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::sync::Arc;

use super::gate::check_mutation;
use super::locks_errors::LockError;
use super::locks_model::{
    BulkLockResult, LockAction, LockAuditEntry, LockFailure, LockModule, LockRequest, LockState,
    PartialUnlockRequest, UnlockRequest,
};
use super::locks_traits::{LockRepositoryTrait, LockServiceTrait};
use crate::errors::{Error, Result};

/// Service for managing module locks and answering gate queries.
pub struct LockService {
    repository: Arc<dyn LockRepositoryTrait>,
}

impl LockService {
    pub fn new(repository: Arc<dyn LockRepositoryTrait>) -> Self {
        Self { repository }
    }

    async fn apply<F>(
        &self,
        module: LockModule,
        action: LockAction,
        actor: &str,
        f: F,
    ) -> Result<LockState>
    where
        F: FnOnce(&LockState) -> std::result::Result<LockState, LockError> + Send,
    {
        let current = self.get_lock_state(module)?;
        let next = f(&current)?;
        let audit = LockAuditEntry::for_state(&next, action, actor);
        let saved = self.repository.save_state(next, audit).await?;
        info!(
            "{} {} by {}: now {} (lock date {:?})",
            module,
            action.as_str(),
            actor,
            saved.status,
            saved.lock_date
        );
        Ok(saved)
    }

    fn collect(result: &mut BulkLockResult, module: LockModule, outcome: Result<LockState>) {
        match outcome {
            Ok(state) => result.updated.push(state),
            Err(e) => {
                warn!("Bulk lock operation skipped {}: {}", module, e);
                result.failures.push(LockFailure {
                    module,
                    message: e.to_string(),
                });
            }
        }
    }
}

#[async_trait]
impl LockServiceTrait for LockService {
    fn get_lock_state(&self, module: LockModule) -> Result<LockState> {
        Ok(self
            .repository
            .get_state(module)?
            .unwrap_or_else(|| LockState::unlocked(module)))
    }

    fn list_lock_states(&self) -> Result<Vec<LockState>> {
        let stored = self.repository.list_states()?;
        Ok(LockModule::ALL
            .iter()
            .map(|module| {
                stored
                    .iter()
                    .find(|s| s.module == *module)
                    .cloned()
                    .unwrap_or_else(|| LockState::unlocked(*module))
            })
            .collect())
    }

    fn get_audit_trail(&self, module: LockModule) -> Result<Vec<LockAuditEntry>> {
        self.repository.list_audit(module)
    }

    fn ensure_mutation_allowed(&self, module: LockModule, date: NaiveDate) -> Result<()> {
        let state = self.get_lock_state(module)?;
        check_mutation(&state, date).map_err(|e| {
            debug!("Gate rejected {} change dated {}: {}", module, date, e);
            Error::from(e)
        })
    }

    async fn lock(
        &self,
        module: LockModule,
        request: LockRequest,
        actor: &str,
    ) -> Result<LockState> {
        self.apply(module, LockAction::Lock, actor, |s| s.lock(&request, actor))
            .await
    }

    async fn edit_lock(
        &self,
        module: LockModule,
        request: LockRequest,
        actor: &str,
    ) -> Result<LockState> {
        self.apply(module, LockAction::EditLock, actor, |s| {
            s.edit_lock(&request, actor)
        })
        .await
    }

    async fn unlock_partial(
        &self,
        module: LockModule,
        request: PartialUnlockRequest,
        actor: &str,
    ) -> Result<LockState> {
        self.apply(module, LockAction::UnlockPartial, actor, |s| {
            s.unlock_partial(&request, actor)
        })
        .await
    }

    async fn unlock_complete(
        &self,
        module: LockModule,
        request: UnlockRequest,
        actor: &str,
    ) -> Result<LockState> {
        self.apply(module, LockAction::UnlockComplete, actor, |s| {
            s.unlock_complete(&request, actor)
        })
        .await
    }

    async fn lock_all(&self, request: LockRequest, actor: &str) -> Result<BulkLockResult> {
        let mut result = BulkLockResult::default();
        for module in LockModule::ALL {
            let outcome = self.lock(module, request.clone(), actor).await;
            Self::collect(&mut result, module, outcome);
        }
        Ok(result)
    }

    async fn unlock_all(&self, request: UnlockRequest, actor: &str) -> Result<BulkLockResult> {
        let mut result = BulkLockResult::default();
        for module in LockModule::ALL {
            let outcome = self.unlock_complete(module, request.clone(), actor).await;
            Self::collect(&mut result, module, outcome);
        }
        Ok(result)
    }
}
