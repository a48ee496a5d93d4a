//! Database models for lock states and audit records.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use std::str::FromStr;

use ledgerkeep_core::locks::{
    LockAction, LockAuditEntry, LockModule, LockState, LockStatus, PartialUnlock,
};
use ledgerkeep_core::Result;

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::lock_states)]
#[diesel(primary_key(module))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LockStateDB {
    pub module: String,
    pub status: String,
    pub lock_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub partial_from: Option<NaiveDate>,
    pub partial_to: Option<NaiveDate>,
    pub partial_reason: Option<String>,
    pub updated_by: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<&LockState> for LockStateDB {
    fn from(state: &LockState) -> Self {
        let window = state.partial_unlock.as_ref();
        Self {
            module: state.module.as_str().to_string(),
            status: state.status.as_str().to_string(),
            lock_date: state.lock_date,
            reason: state.reason.clone(),
            partial_from: window.map(|w| w.from),
            partial_to: window.map(|w| w.to),
            partial_reason: window.map(|w| w.reason.clone()),
            updated_by: state.updated_by.clone(),
            updated_at: state.updated_at,
        }
    }
}

impl TryFrom<LockStateDB> for LockState {
    type Error = ledgerkeep_core::Error;

    fn try_from(db: LockStateDB) -> Result<Self> {
        let partial_unlock = match (db.partial_from, db.partial_to) {
            (Some(from), Some(to)) => Some(PartialUnlock {
                from,
                to,
                reason: db.partial_reason.unwrap_or_default(),
            }),
            _ => None,
        };
        Ok(Self {
            module: LockModule::from_str(&db.module)?,
            status: LockStatus::from_str(&db.status)?,
            lock_date: db.lock_date,
            reason: db.reason,
            partial_unlock,
            updated_by: db.updated_by,
            updated_at: db.updated_at,
        })
    }
}

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::lock_audit)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LockAuditDB {
    pub id: String,
    pub module: String,
    pub action: String,
    pub actor: String,
    pub status_after: String,
    pub lock_date: Option<NaiveDate>,
    pub partial_from: Option<NaiveDate>,
    pub partial_to: Option<NaiveDate>,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<LockAuditEntry> for LockAuditDB {
    fn from(entry: LockAuditEntry) -> Self {
        Self {
            id: entry.id,
            module: entry.module.as_str().to_string(),
            action: entry.action.as_str().to_string(),
            actor: entry.actor,
            status_after: entry.status_after.as_str().to_string(),
            lock_date: entry.lock_date,
            partial_from: entry.partial_from,
            partial_to: entry.partial_to,
            reason: entry.reason,
            created_at: entry.created_at,
        }
    }
}

impl TryFrom<LockAuditDB> for LockAuditEntry {
    type Error = ledgerkeep_core::Error;

    fn try_from(db: LockAuditDB) -> Result<Self> {
        Ok(Self {
            module: LockModule::from_str(&db.module)?,
            action: LockAction::from_str(&db.action)?,
            status_after: LockStatus::from_str(&db.status_after)?,
            id: db.id,
            actor: db.actor,
            lock_date: db.lock_date,
            partial_from: db.partial_from,
            partial_to: db.partial_to,
            reason: db.reason,
            created_at: db.created_at,
        })
    }
}
