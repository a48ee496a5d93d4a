//! Runtime settings shared by the ledger services.

mod settings_model;

pub use settings_model::LedgerSettings;
