use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use std::sync::Arc;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::{lock_audit, lock_states};

use super::model::{LockAuditDB, LockStateDB};
use ledgerkeep_core::locks::{LockAuditEntry, LockModule, LockRepositoryTrait, LockState};
use ledgerkeep_core::Result;

pub struct LockRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl LockRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl LockRepositoryTrait for LockRepository {
    fn get_state(&self, module: LockModule) -> Result<Option<LockState>> {
        let mut conn = get_connection(&self.pool)?;
        lock_states::table
            .find(module.as_str())
            .select(LockStateDB::as_select())
            .first::<LockStateDB>(&mut conn)
            .optional()
            .into_core()?
            .map(LockState::try_from)
            .transpose()
    }

    fn list_states(&self) -> Result<Vec<LockState>> {
        let mut conn = get_connection(&self.pool)?;
        lock_states::table
            .select(LockStateDB::as_select())
            .load::<LockStateDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(LockState::try_from)
            .collect()
    }

    async fn save_state(&self, state: LockState, audit: LockAuditEntry) -> Result<LockState> {
        let state_db = LockStateDB::from(&state);
        let audit_db = LockAuditDB::from(audit);

        self.writer
            .exec(move |conn| {
                diesel::insert_into(lock_states::table)
                    .values(&state_db)
                    .on_conflict(lock_states::module)
                    .do_update()
                    .set((
                        lock_states::status.eq(excluded(lock_states::status)),
                        lock_states::lock_date.eq(excluded(lock_states::lock_date)),
                        lock_states::reason.eq(excluded(lock_states::reason)),
                        lock_states::partial_from.eq(excluded(lock_states::partial_from)),
                        lock_states::partial_to.eq(excluded(lock_states::partial_to)),
                        lock_states::partial_reason.eq(excluded(lock_states::partial_reason)),
                        lock_states::updated_by.eq(excluded(lock_states::updated_by)),
                        lock_states::updated_at.eq(excluded(lock_states::updated_at)),
                    ))
                    .execute(conn)
                    .into_core()?;

                diesel::insert_into(lock_audit::table)
                    .values(&audit_db)
                    .execute(conn)
                    .into_core()?;

                Ok(state)
            })
            .await
    }

    fn list_audit(&self, module: LockModule) -> Result<Vec<LockAuditEntry>> {
        let mut conn = get_connection(&self.pool)?;
        lock_audit::table
            .filter(lock_audit::module.eq(module.as_str()))
            .order((lock_audit::created_at.asc(), lock_audit::id.asc()))
            .select(LockAuditDB::as_select())
            .load::<LockAuditDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(LockAuditEntry::try_from)
            .collect()
    }
}
