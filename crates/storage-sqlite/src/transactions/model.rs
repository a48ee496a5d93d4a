//! Database model for canonical transactions.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use std::str::FromStr;

use crate::utils::{decimal_from_db, decimal_to_db, from_json, optional_decimal_from_db, to_json};
use ledgerkeep_core::imports::RawRow;
use ledgerkeep_core::transactions::{
    CanonicalTransaction, ReconciliationStatus, TransactionType,
};
use ledgerkeep_core::Result;

/// Amounts are decimal strings; `raw_row` is the source row as JSON.
#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionDB {
    pub id: String,
    pub account_id: String,
    pub date: NaiveDate,
    pub description: String,
    pub payee: Option<String>,
    pub reference_number: Option<String>,
    pub withdrawal: Option<String>,
    pub deposit: Option<String>,
    pub amount: String,
    pub transaction_type: String,
    pub raw_row: Option<String>,
    pub import_batch_id: Option<String>,
    pub content_hash: String,
    pub reconciliation_status: String,
    pub needs_review: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TransactionDB {
    pub fn from_domain(tx: &CanonicalTransaction) -> Result<Self> {
        Ok(Self {
            id: tx.id.clone(),
            account_id: tx.account_id.clone(),
            date: tx.date,
            description: tx.description.clone(),
            payee: tx.payee.clone(),
            reference_number: tx.reference_number.clone(),
            withdrawal: tx.withdrawal.map(decimal_to_db),
            deposit: tx.deposit.map(decimal_to_db),
            amount: decimal_to_db(tx.amount),
            transaction_type: tx.transaction_type.as_str().to_string(),
            raw_row: tx.raw_row.as_ref().map(to_json).transpose()?,
            import_batch_id: tx.import_batch_id.clone(),
            content_hash: tx.content_hash.clone(),
            reconciliation_status: tx.reconciliation_status.as_str().to_string(),
            needs_review: tx.needs_review,
            created_at: tx.created_at,
            updated_at: tx.updated_at,
        })
    }
}

impl TryFrom<TransactionDB> for CanonicalTransaction {
    type Error = ledgerkeep_core::Error;

    fn try_from(db: TransactionDB) -> Result<Self> {
        Ok(Self {
            withdrawal: optional_decimal_from_db(db.withdrawal.as_deref(), "withdrawal")?,
            deposit: optional_decimal_from_db(db.deposit.as_deref(), "deposit")?,
            amount: decimal_from_db(&db.amount, "amount")?,
            transaction_type: TransactionType::from_str(&db.transaction_type)?,
            raw_row: db
                .raw_row
                .as_deref()
                .map(from_json::<RawRow>)
                .transpose()?,
            reconciliation_status: ReconciliationStatus::from_str(&db.reconciliation_status)?,
            id: db.id,
            account_id: db.account_id,
            date: db.date,
            description: db.description,
            payee: db.payee,
            reference_number: db.reference_number,
            import_batch_id: db.import_batch_id,
            content_hash: db.content_hash,
            needs_review: db.needs_review,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}
