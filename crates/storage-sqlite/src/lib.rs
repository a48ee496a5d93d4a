//! SQLite storage implementation for Ledgerkeep.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `ledgerkeep-core` and contains:
//! - Database connection pooling and the single-writer actor
//! - Embedded Diesel migrations
//! - Repository implementations for accounts, imports, transactions, journal and locks
//! - Database-specific model types (with Diesel derives)
//!
//! ```text
//!   core (domain, traits)
//!            │
//!            ▼
//!   storage-sqlite (this crate)
//!            │
//!            ▼
//!        SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod accounts;
pub mod imports;
pub mod journal;
pub mod locks;
pub mod transactions;

#[cfg(test)]
mod test_support;

pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

pub use errors::{IntoCore, StorageError};

pub use accounts::AccountRepository;
pub use imports::ImportRepository;
pub use journal::JournalRepository;
pub use locks::LockRepository;
pub use transactions::TransactionRepository;

// Re-export from ledgerkeep-core for convenience
pub use ledgerkeep_core::errors::{DatabaseError, Error, Result};
