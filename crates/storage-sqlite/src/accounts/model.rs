//! Database model for accounts.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use std::str::FromStr;

use ledgerkeep_core::accounts::{Account, AccountType, NewAccount};
use ledgerkeep_core::Result;

/// Database model for accounts
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::accounts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AccountDB {
    pub id: String,
    pub name: String,
    pub account_type: String,
    pub currency: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl AccountDB {
    pub fn from_new(domain: NewAccount, now: NaiveDateTime) -> Self {
        Self {
            id: domain
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::now_v7().to_string()),
            name: domain.name.trim().to_string(),
            account_type: domain.account_type.as_str().to_string(),
            currency: domain.currency.trim().to_uppercase(),
            is_active: domain.is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

impl TryFrom<AccountDB> for Account {
    type Error = ledgerkeep_core::Error;

    fn try_from(db: AccountDB) -> Result<Self> {
        Ok(Self {
            account_type: AccountType::from_str(&db.account_type)?,
            id: db.id,
            name: db.name,
            currency: db.currency,
            is_active: db.is_active,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}
