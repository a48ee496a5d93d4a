//! Helpers shared by the repositories.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::str::FromStr;

use crate::errors::{IntoCore, StorageError};
use ledgerkeep_core::Result;

/// Maximum number of parameters for SQLite `IN (...)` queries.
///
/// SQLite caps bound parameters per statement, so long id or hash lists are
/// queried in chunks of this size.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Splits a slice into chunks that fit an `IN (...)` clause.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

/// Bound parameters allowed in one multi-row `INSERT`.
pub const SQLITE_MAX_INSERT_PARAMS: usize = 900;

/// Rows per multi-row `INSERT` for a table with `columns` columns.
pub fn rows_per_insert(columns: usize) -> usize {
    (SQLITE_MAX_INSERT_PARAMS / columns.max(1)).max(1)
}

/// Decimals are stored as text to keep their exact scale.
pub fn decimal_to_db(value: Decimal) -> String {
    value.to_string()
}

pub fn decimal_from_db(value: &str, column: &str) -> Result<Decimal> {
    Decimal::from_str(value).map_err(|e| {
        StorageError::SerializationError(format!(
            "column {} holds '{}', not a decimal: {}",
            column, value, e
        ))
        .into()
    })
}

pub fn optional_decimal_from_db(value: Option<&str>, column: &str) -> Result<Option<Decimal>> {
    value.map(|v| decimal_from_db(v, column)).transpose()
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).into_core()
}

pub fn from_json<T: DeserializeOwned>(value: &str) -> Result<T> {
    serde_json::from_str(value).into_core()
}

/// Row counts are stored as SQLite integers.
pub fn count_to_db(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

pub fn count_from_db(count: i32) -> usize {
    usize::try_from(count).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_chunk_for_sqlite_empty() {
        let items: Vec<i32> = vec![];
        assert_eq!(chunk_for_sqlite(&items).count(), 0);
    }

    #[test]
    fn test_chunk_for_sqlite_over_limit() {
        let items: Vec<i32> = (0..1200).collect();
        let chunks: Vec<_> = chunk_for_sqlite(&items).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), SQLITE_MAX_PARAMS_CHUNK);
        assert_eq!(chunks[2].len(), 200);
    }

    #[test]
    fn test_rows_per_insert_stays_under_limit() {
        assert_eq!(rows_per_insert(17), 52);
        assert_eq!(rows_per_insert(3), 300);
        assert_eq!(rows_per_insert(0), SQLITE_MAX_INSERT_PARAMS);
    }

    #[test]
    fn test_decimal_keeps_scale() {
        let stored = decimal_to_db(dec!(45.10));
        assert_eq!(stored, "45.10");
        assert_eq!(decimal_from_db(&stored, "amount").unwrap(), dec!(45.10));
    }

    #[test]
    fn test_bad_decimal_is_an_error() {
        assert!(decimal_from_db("12a", "amount").is_err());
        assert_eq!(optional_decimal_from_db(None, "deposit").unwrap(), None);
    }
}
