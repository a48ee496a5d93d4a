//! Locks module - per-module period locks and the mutation gate.

mod gate;
mod locks_errors;
mod locks_model;
mod locks_service;
mod locks_traits;


pub use gate::{check_mutation, is_mutation_allowed};
pub use locks_errors::LockError;
pub use locks_model::{
    BulkLockResult, LockAction, LockAuditEntry, LockFailure, LockModule, LockRequest, LockState,
    LockStatus, PartialUnlock, PartialUnlockRequest, UnlockRequest,
};
pub use locks_service::LockService;
pub use locks_traits::{LockRepositoryTrait, LockServiceTrait};
