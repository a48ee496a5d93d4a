//! Lock domain models and transitions.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::locks_errors::LockError;
use crate::errors::{Error, ValidationError};

/// Module whose records a lock freezes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockModule {
    Sales,
    Purchases,
    Banking,
    Accountant,
}

impl LockModule {
    pub const ALL: [LockModule; 4] = [
        LockModule::Sales,
        LockModule::Purchases,
        LockModule::Banking,
        LockModule::Accountant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LockModule::Sales => "sales",
            LockModule::Purchases => "purchases",
            LockModule::Banking => "banking",
            LockModule::Accountant => "accountant",
        }
    }
}

impl fmt::Display for LockModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LockModule::Sales => "Sales",
            LockModule::Purchases => "Purchases",
            LockModule::Banking => "Banking",
            LockModule::Accountant => "Accountant",
        };
        f.write_str(label)
    }
}

impl FromStr for LockModule {
    type Err = LockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sales" => Ok(LockModule::Sales),
            "purchases" => Ok(LockModule::Purchases),
            "banking" => Ok(LockModule::Banking),
            "accountant" => Ok(LockModule::Accountant),
            _ => Err(LockError::UnknownModule(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStatus {
    Unlocked,
    Locked,
    PartiallyUnlocked,
}

impl LockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockStatus::Unlocked => "unlocked",
            LockStatus::Locked => "locked",
            LockStatus::PartiallyUnlocked => "partially_unlocked",
        }
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockStatus {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "unlocked" => Ok(LockStatus::Unlocked),
            "locked" => Ok(LockStatus::Locked),
            "partially_unlocked" => Ok(LockStatus::PartiallyUnlocked),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown lock status '{}'",
                other
            )))),
        }
    }
}

/// Management action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockAction {
    Lock,
    EditLock,
    UnlockPartial,
    UnlockComplete,
}

impl LockAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockAction::Lock => "lock",
            LockAction::EditLock => "edit_lock",
            LockAction::UnlockPartial => "unlock_partial",
            LockAction::UnlockComplete => "unlock_complete",
        }
    }
}

impl fmt::Display for LockAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            LockAction::Lock => "lock",
            LockAction::EditLock => "edit the lock of",
            LockAction::UnlockPartial => "partially unlock",
            LockAction::UnlockComplete => "unlock",
        };
        f.write_str(verb)
    }
}

impl FromStr for LockAction {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "lock" => Ok(LockAction::Lock),
            "edit_lock" => Ok(LockAction::EditLock),
            "unlock_partial" => Ok(LockAction::UnlockPartial),
            "unlock_complete" => Ok(LockAction::UnlockComplete),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown lock action '{}'",
                other
            )))),
        }
    }
}

/// Date range reopened inside a locked period, bounds inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialUnlock {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub reason: String,
}

impl PartialUnlock {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Current lock configuration of one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockState {
    pub module: LockModule,
    pub status: LockStatus,
    /// Records dated on or before this date are frozen.
    pub lock_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub partial_unlock: Option<PartialUnlock>,
    pub updated_by: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
}

impl LockState {
    /// State of a module nobody has locked yet.
    pub fn unlocked(module: LockModule) -> Self {
        Self {
            module,
            status: LockStatus::Unlocked,
            lock_date: None,
            reason: None,
            partial_unlock: None,
            updated_by: None,
            updated_at: None,
        }
    }

    fn transition_error(&self, action: LockAction) -> LockError {
        LockError::InvalidLockTransition {
            module: self.module,
            status: self.status,
            action,
        }
    }

    fn touched(mut self, actor: &str) -> Self {
        self.updated_by = Some(actor.to_string());
        self.updated_at = Some(Utc::now().naive_utc());
        self
    }

    /// Locks an unlocked module.
    pub fn lock(&self, request: &LockRequest, actor: &str) -> Result<LockState, LockError> {
        if self.status != LockStatus::Unlocked {
            return Err(self.transition_error(LockAction::Lock));
        }
        let reason = required_reason(request.reason.as_deref(), self.module, LockAction::Lock)?;
        Ok(LockState {
            module: self.module,
            status: LockStatus::Locked,
            lock_date: Some(request.lock_date),
            reason: Some(reason),
            partial_unlock: None,
            updated_by: None,
            updated_at: None,
        }
        .touched(actor))
    }

    /// Moves the lock date of a locked or partially unlocked module.
    ///
    /// An existing partial window survives only if it still ends on or before
    /// the new lock date.
    pub fn edit_lock(&self, request: &LockRequest, actor: &str) -> Result<LockState, LockError> {
        if self.status == LockStatus::Unlocked {
            return Err(self.transition_error(LockAction::EditLock));
        }
        let reason =
            required_reason(request.reason.as_deref(), self.module, LockAction::EditLock)?;
        if let Some(window) = &self.partial_unlock {
            if window.to > request.lock_date {
                return Err(LockError::window(
                    self.module,
                    format!(
                        "open window {}..{} extends past the new lock date {}",
                        window.from, window.to, request.lock_date
                    ),
                ));
            }
        }
        let mut next = self.clone();
        next.lock_date = Some(request.lock_date);
        next.reason = Some(reason);
        Ok(next.touched(actor))
    }

    /// Reopens `[from, to]` inside the locked period, replacing any previous
    /// window.
    pub fn unlock_partial(
        &self,
        request: &PartialUnlockRequest,
        actor: &str,
    ) -> Result<LockState, LockError> {
        let lock_date = match (self.status, self.lock_date) {
            (LockStatus::Locked | LockStatus::PartiallyUnlocked, Some(date)) => date,
            _ => return Err(self.transition_error(LockAction::UnlockPartial)),
        };
        let reason = required_reason(
            request.reason.as_deref(),
            self.module,
            LockAction::UnlockPartial,
        )?;
        if request.from > request.to {
            return Err(LockError::window(
                self.module,
                format!("start {} is after end {}", request.from, request.to),
            ));
        }
        if request.to > lock_date {
            return Err(LockError::window(
                self.module,
                format!("end {} is after the lock date {}", request.to, lock_date),
            ));
        }
        let mut next = self.clone();
        next.status = LockStatus::PartiallyUnlocked;
        next.partial_unlock = Some(PartialUnlock {
            from: request.from,
            to: request.to,
            reason,
        });
        Ok(next.touched(actor))
    }

    /// Removes the lock entirely.
    pub fn unlock_complete(
        &self,
        request: &UnlockRequest,
        actor: &str,
    ) -> Result<LockState, LockError> {
        if self.status == LockStatus::Unlocked {
            return Err(self.transition_error(LockAction::UnlockComplete));
        }
        Ok(LockState {
            module: self.module,
            status: LockStatus::Unlocked,
            lock_date: None,
            reason: request
                .reason
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            partial_unlock: None,
            updated_by: None,
            updated_at: None,
        }
        .touched(actor))
    }
}

fn required_reason(
    reason: Option<&str>,
    module: LockModule,
    action: LockAction,
) -> Result<String, LockError> {
    match reason.map(str::trim) {
        Some(r) if !r.is_empty() => Ok(r.to_string()),
        _ => Err(LockError::MissingReason { module, action }),
    }
}

/// Audit record of one lock management action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockAuditEntry {
    pub id: String,
    pub module: LockModule,
    pub action: LockAction,
    pub actor: String,
    pub status_after: LockStatus,
    pub lock_date: Option<NaiveDate>,
    pub partial_from: Option<NaiveDate>,
    pub partial_to: Option<NaiveDate>,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
}

impl LockAuditEntry {
    /// Audit record describing `state` right after `action`.
    pub fn for_state(state: &LockState, action: LockAction, actor: &str) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            module: state.module,
            action,
            actor: actor.to_string(),
            status_after: state.status,
            lock_date: state.lock_date,
            partial_from: state.partial_unlock.as_ref().map(|w| w.from),
            partial_to: state.partial_unlock.as_ref().map(|w| w.to),
            reason: match action {
                LockAction::UnlockPartial => {
                    state.partial_unlock.as_ref().map(|w| w.reason.clone())
                }
                _ => state.reason.clone(),
            },
            created_at: state.updated_at.unwrap_or_else(|| Utc::now().naive_utc()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRequest {
    pub lock_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialUnlockRequest {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRequest {
    pub reason: Option<String>,
}

/// A module that a bulk operation could not transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockFailure {
    pub module: LockModule,
    pub message: String,
}

/// Outcome of lock-all / unlock-all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkLockResult {
    pub updated: Vec<LockState>,
    pub failures: Vec<LockFailure>,
}
