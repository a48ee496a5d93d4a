//! Lock repository and service traits.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::locks_model::{
    BulkLockResult, LockAuditEntry, LockModule, LockRequest, LockState, PartialUnlockRequest,
    UnlockRequest,
};
use crate::errors::Result;

/// Storage contract for module lock states and their audit trail.
#[async_trait]
pub trait LockRepositoryTrait: Send + Sync {
    /// Stored state of a module, `None` if it was never locked.
    fn get_state(&self, module: LockModule) -> Result<Option<LockState>>;

    fn list_states(&self) -> Result<Vec<LockState>>;

    /// Upserts the state and appends the audit record in one write.
    async fn save_state(&self, state: LockState, audit: LockAuditEntry) -> Result<LockState>;

    /// Audit records of a module, oldest first.
    fn list_audit(&self, module: LockModule) -> Result<Vec<LockAuditEntry>>;
}

#[async_trait]
pub trait LockServiceTrait: Send + Sync {
    /// Current state of a module; modules never locked report `unlocked`.
    fn get_lock_state(&self, module: LockModule) -> Result<LockState>;

    /// States of every module in a fixed order.
    fn list_lock_states(&self) -> Result<Vec<LockState>>;

    fn get_audit_trail(&self, module: LockModule) -> Result<Vec<LockAuditEntry>>;

    /// Fails with `PeriodLocked` when a record dated `date` in `module` is frozen.
    fn ensure_mutation_allowed(&self, module: LockModule, date: NaiveDate) -> Result<()>;

    async fn lock(
        &self,
        module: LockModule,
        request: LockRequest,
        actor: &str,
    ) -> Result<LockState>;

    async fn edit_lock(
        &self,
        module: LockModule,
        request: LockRequest,
        actor: &str,
    ) -> Result<LockState>;

    async fn unlock_partial(
        &self,
        module: LockModule,
        request: PartialUnlockRequest,
        actor: &str,
    ) -> Result<LockState>;

    async fn unlock_complete(
        &self,
        module: LockModule,
        request: UnlockRequest,
        actor: &str,
    ) -> Result<LockState>;

    /// Applies `lock` to every module, collecting failures.
    async fn lock_all(&self, request: LockRequest, actor: &str) -> Result<BulkLockResult>;

    /// Applies `unlock_complete` to every module, collecting failures.
    async fn unlock_all(&self, request: UnlockRequest, actor: &str) -> Result<BulkLockResult>;
}
