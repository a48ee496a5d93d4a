//! Mutation gate consulted before any dated record is created, edited or
//! deleted.

use chrono::NaiveDate;

use super::locks_errors::LockError;
use super::locks_model::{LockState, LockStatus};

/// Checks whether a record dated `date` may change under `state`.
///
/// Unlocked modules allow everything. A partial window reopens its inclusive
/// range. Any other date must be strictly after the lock date.
pub fn check_mutation(state: &LockState, date: NaiveDate) -> Result<(), LockError> {
    if state.status == LockStatus::Unlocked {
        return Ok(());
    }
    if state.status == LockStatus::PartiallyUnlocked {
        if let Some(window) = &state.partial_unlock {
            if window.contains(date) {
                return Ok(());
            }
        }
    }
    match state.lock_date {
        Some(lock_date) if date <= lock_date => Err(LockError::PeriodLocked {
            module: state.module,
            date,
            lock_date,
            reason: state.reason.clone(),
        }),
        _ => Ok(()),
    }
}

pub fn is_mutation_allowed(state: &LockState, date: NaiveDate) -> bool {
    check_mutation(state, date).is_ok()
}
