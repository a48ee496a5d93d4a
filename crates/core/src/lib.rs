//! Ledgerkeep Core - Domain entities, services, and traits.
//!
//! This crate contains the statement import pipeline, the journal balancing
//! engine and the period lock gate. It is database-agnostic and defines
//! traits that are implemented by the `storage-sqlite` crate.

pub mod accounts;
pub mod constants;
pub mod errors;
pub mod imports;
pub mod journal;
pub mod locks;
pub mod settings;
pub mod transactions;

#[cfg(test)]
mod test_support;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
