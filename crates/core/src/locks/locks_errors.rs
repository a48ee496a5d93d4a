//! Lock error types.

use chrono::NaiveDate;
use thiserror::Error;

use super::locks_model::{LockAction, LockModule, LockStatus};

/// Errors raised by the lock gate and by lock management.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LockError {
    /// A mutation touched a date inside a locked period.
    #[error(
        "{module} is locked through {lock_date}; records dated {date} cannot be changed{}",
        reason.as_deref().map(|r| format!(" (reason: {})", r)).unwrap_or_default()
    )]
    PeriodLocked {
        module: LockModule,
        date: NaiveDate,
        lock_date: NaiveDate,
        reason: Option<String>,
    },

    /// The requested management action is not valid from the current status.
    #[error("Cannot {action} {module} while it is {status}")]
    InvalidLockTransition {
        module: LockModule,
        status: LockStatus,
        action: LockAction,
    },

    /// A partial unlock window is malformed or falls outside the locked range.
    #[error("Invalid unlock window for {module}: {message}")]
    InvalidLockWindow { module: LockModule, message: String },

    /// Locking and partial unlocking need a reason for the audit trail.
    #[error("A reason is required to {action} {module}")]
    MissingReason {
        module: LockModule,
        action: LockAction,
    },

    /// Unknown module name supplied by a caller.
    #[error("Unknown lock module '{0}'")]
    UnknownModule(String),
}

impl LockError {
    pub fn window(module: LockModule, message: impl Into<String>) -> Self {
        Self::InvalidLockWindow {
            module,
            message: message.into(),
        }
    }
}
