//! Account domain models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{errors::ValidationError, Error, Result};

/// Classification of a ledger account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Bank,
    CreditCard,
    Cash,
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Bank => "bank",
            AccountType::CreditCard => "credit_card",
            AccountType::Cash => "cash",
            AccountType::Asset => "asset",
            AccountType::Liability => "liability",
            AccountType::Equity => "equity",
            AccountType::Income => "income",
            AccountType::Expense => "expense",
        }
    }

    /// Accounts that can receive imported statements.
    pub fn accepts_statements(&self) -> bool {
        matches!(
            self,
            AccountType::Bank | AccountType::CreditCard | AccountType::Cash
        )
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bank" => Ok(AccountType::Bank),
            "credit_card" => Ok(AccountType::CreditCard),
            "cash" => Ok(AccountType::Cash),
            "asset" => Ok(AccountType::Asset),
            "liability" => Ok(AccountType::Liability),
            "equity" => Ok(AccountType::Equity),
            "income" => Ok(AccountType::Income),
            "expense" => Ok(AccountType::Expense),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown account type '{}'",
                other
            )))),
        }
    }
}

/// Domain model representing an account in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub account_type: AccountType,
    pub currency: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Input model for creating a new account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub account_type: AccountType,
    pub currency: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl NewAccount {
    /// Validates the new account data.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Account name cannot be empty".to_string(),
            )));
        }
        if self.currency.trim().len() != 3 {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Currency '{}' is not a three-letter code",
                self.currency
            ))));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(name: &str, currency: &str) -> NewAccount {
        NewAccount {
            id: None,
            name: name.to_string(),
            account_type: AccountType::Bank,
            currency: currency.to_string(),
            is_active: true,
        }
    }

    #[test]
    fn test_validate_accepts_complete_account() {
        assert!(new_account("Operating", "USD").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        assert!(new_account("   ", "USD").validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_currency() {
        assert!(new_account("Operating", "US").validate().is_err());
    }

    #[test]
    fn test_account_type_round_trips_through_str() {
        for kind in [
            AccountType::Bank,
            AccountType::CreditCard,
            AccountType::Expense,
        ] {
            assert_eq!(AccountType::from_str(kind.as_str()).unwrap(), kind);
        }
        assert!(AccountType::from_str("SECURITIES").is_err());
    }

    #[test]
    fn test_account_type_serializes_snake_case() {
        let json = serde_json::to_string(&AccountType::CreditCard).unwrap();
        assert_eq!(json, r#""credit_card""#);
    }

    #[test]
    fn test_statement_capable_types() {
        assert!(AccountType::Bank.accepts_statements());
        assert!(AccountType::CreditCard.accepts_statements());
        assert!(!AccountType::Income.accepts_statements());
    }
}
