//! Transactions module - canonical bank transactions and reconciliation.

mod transactions_model;
mod transactions_service;
mod transactions_traits;

#[cfg(test)]
mod transactions_service_tests;

pub use transactions_model::{
    derive_amount, CanonicalTransaction, NewTransaction, ReconciliationStatus,
    TransactionCandidate, TransactionFilter, TransactionType, TransactionUpdate,
};
pub use transactions_service::TransactionService;
pub use transactions_traits::{TransactionRepositoryTrait, TransactionServiceTrait};
