//! Content hash used to recognise a transaction that was already imported.
//!
//! The hash covers only identity fields, in a fixed order, so extra columns
//! in the raw row never change it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

/// SHA-256 over `account_id`, `date`, `description`, signed amount and
/// reference, each field prefixed with its byte length.
///
/// The description is whitespace-collapsed, the amount is scale-normalized
/// (`990`, `990.0` and `990.00` hash alike) and the reference only
/// contributes when present.
pub fn compute_content_hash(
    account_id: &str,
    date: NaiveDate,
    description: &str,
    signed_amount: Decimal,
    reference_number: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();

    update_field(&mut hasher, account_id);
    update_field(&mut hasher, &date.format("%Y-%m-%d").to_string());
    update_field(&mut hasher, &normalize_description(description));
    update_field(&mut hasher, &normalize_decimal(signed_amount));

    if let Some(reference) = reference_number.map(str::trim).filter(|r| !r.is_empty()) {
        update_field(&mut hasher, reference);
    }

    hex::encode(hasher.finalize())
}

fn update_field(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn normalize_decimal(d: Decimal) -> String {
    d.normalize().to_string()
}

fn normalize_description(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
