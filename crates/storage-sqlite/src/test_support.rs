//! Throwaway databases for repository tests.

use std::sync::Arc;
use tempfile::TempDir;

use crate::accounts::AccountRepository;
use crate::db::{create_pool, init, run_migrations, spawn_writer, DbPool, WriteHandle};
use ledgerkeep_core::accounts::{AccountRepositoryTrait, AccountType, NewAccount};

/// A migrated database in a temporary directory. Must be created inside a
/// Tokio runtime because it starts the writer task.
pub struct TestDb {
    pub pool: Arc<DbPool>,
    pub writer: WriteHandle,
    _dir: TempDir,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let db_path = init(path.to_str().unwrap()).unwrap();
        let pool = create_pool(&db_path).unwrap();
        run_migrations(&pool).unwrap();
        let writer = spawn_writer((*pool).clone());
        Self {
            pool,
            writer,
            _dir: dir,
        }
    }

    /// Database with one active USD bank account per id.
    pub async fn with_accounts(ids: &[&str]) -> Self {
        let db = Self::new();
        let accounts = AccountRepository::new(db.pool.clone(), db.writer.clone());
        for id in ids {
            accounts
                .create(NewAccount {
                    id: Some(id.to_string()),
                    name: id.to_string(),
                    account_type: AccountType::Bank,
                    currency: "USD".to_string(),
                    is_active: true,
                })
                .await
                .unwrap();
        }
        db
    }

    pub async fn add_account(&self, id: &str, account_type: AccountType) {
        AccountRepository::new(self.pool.clone(), self.writer.clone())
            .create(NewAccount {
                id: Some(id.to_string()),
                name: id.to_string(),
                account_type,
                currency: "USD".to_string(),
                is_active: true,
            })
            .await
            .unwrap();
    }
}
