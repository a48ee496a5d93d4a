use std::sync::Arc;

use crate::config::{Config, LogFormat};
use ledgerkeep_core::{
    accounts::{AccountService, AccountServiceTrait},
    imports::{ImportService, ImportServiceTrait},
    journal::{JournalService, JournalServiceTrait},
    locks::{LockService, LockServiceTrait},
    settings::LedgerSettings,
    transactions::{TransactionService, TransactionServiceTrait},
};
use ledgerkeep_storage_sqlite::{
    create_pool, init, run_migrations, spawn_writer, AccountRepository, ImportRepository,
    JournalRepository, LockRepository, TransactionRepository,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub account_service: Arc<dyn AccountServiceTrait>,
    pub import_service: Arc<dyn ImportServiceTrait>,
    pub transaction_service: Arc<dyn TransactionServiceTrait>,
    pub journal_service: Arc<dyn JournalServiceTrait>,
    pub lock_service: Arc<dyn LockServiceTrait>,
    pub settings: LedgerSettings,
}

/// Installs the global subscriber. `log` records from the library crates are
/// forwarded into it.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init(),
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = create_pool(&db_path)?;
    run_migrations(&pool)?;
    let writer = spawn_writer((*pool).clone());

    let account_repo = Arc::new(AccountRepository::new(pool.clone(), writer.clone()));
    let lock_repo = Arc::new(LockRepository::new(pool.clone(), writer.clone()));
    let transaction_repo = Arc::new(TransactionRepository::new(pool.clone(), writer.clone()));
    let import_repo = Arc::new(ImportRepository::new(pool.clone(), writer.clone()));
    let journal_repo = Arc::new(JournalRepository::new(pool.clone(), writer.clone()));

    let settings = config.ledger.clone();

    let account_service: Arc<dyn AccountServiceTrait> =
        Arc::new(AccountService::new(account_repo));
    let lock_service: Arc<dyn LockServiceTrait> = Arc::new(LockService::new(lock_repo));
    let transaction_service: Arc<dyn TransactionServiceTrait> = Arc::new(
        TransactionService::new(
            transaction_repo.clone(),
            account_service.clone(),
            lock_service.clone(),
        ),
    );
    let import_service: Arc<dyn ImportServiceTrait> = Arc::new(ImportService::new(
        import_repo,
        transaction_repo,
        account_service.clone(),
        lock_service.clone(),
        settings.clone(),
    ));
    let journal_service: Arc<dyn JournalServiceTrait> = Arc::new(JournalService::new(
        journal_repo,
        account_service.clone(),
        transaction_service.clone(),
        lock_service.clone(),
        settings.clone(),
    ));

    Ok(Arc::new(AppState {
        account_service,
        import_service,
        transaction_service,
        journal_service,
        lock_service,
        settings,
    }))
}
