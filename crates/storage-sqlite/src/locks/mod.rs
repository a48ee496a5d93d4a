//! SQLite storage implementation for module locks and their audit trail.

mod model;
mod repository;

pub use model::{LockAuditDB, LockStateDB};
pub use repository::LockRepository;
