//! Heuristic mapping suggestions for freshly uploaded statements.
//!
//! Suggestions only pre-fill the mapping form; nothing is committed with a
//! suggested mapping until the caller submits it explicitly.

use super::field_mapping::{CanonicalField, FieldMapping, MappingConfig};
use super::imports_model::RawRow;
use super::normalizer::{is_blank, parse_amount, DateFormat, DecimalFormat};

const DATE_SYNONYMS: &[&str] = &[
    "date",
    "txndate",
    "transactiondate",
    "trandate",
    "valuedate",
    "valuedt",
    "postingdate",
    "posteddate",
    "postdate",
    "bookingdate",
];
const DESCRIPTION_SYNONYMS: &[&str] = &[
    "description",
    "narration",
    "details",
    "transactiondetails",
    "particulars",
    "memo",
    "remarks",
    "transactiondescription",
];
const WITHDRAWAL_SYNONYMS: &[&str] = &[
    "withdrawals",
    "withdrawal",
    "withdrawalamt",
    "withdrawalamount",
    "debit",
    "debits",
    "debitamount",
    "paidout",
    "moneyout",
    "dr",
];
const DEPOSIT_SYNONYMS: &[&str] = &[
    "deposits",
    "deposit",
    "depositamt",
    "depositamount",
    "credit",
    "credits",
    "creditamount",
    "paidin",
    "moneyin",
    "cr",
];
const PAYEE_SYNONYMS: &[&str] = &["payee", "merchant", "beneficiary", "counterparty", "paidto"];
const REFERENCE_SYNONYMS: &[&str] = &[
    "reference",
    "referencenumber",
    "referenceno",
    "refno",
    "ref",
    "chqrefno",
    "chequeno",
    "chqno",
    "checknumber",
    "transactionid",
];

/// Date patterns tried, in order, against sample values.
const DATE_PATTERNS: &[&str] = &[
    "dd-MM-yyyy",
    "dd/MM/yyyy",
    "MM/dd/yyyy",
    "yyyy-MM-dd",
    "dd.MM.yyyy",
    "dd MMM yyyy",
    "dd-MMM-yyyy",
    "dd/MM/yy",
    "MM/dd/yy",
    "dd-MM-yy",
];

const DEFAULT_DATE_PATTERN: &str = "dd-MM-yyyy";

fn normalize(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn synonyms(field: CanonicalField) -> &'static [&'static str] {
    match field {
        CanonicalField::Date => DATE_SYNONYMS,
        CanonicalField::Description => DESCRIPTION_SYNONYMS,
        CanonicalField::Withdrawals => WITHDRAWAL_SYNONYMS,
        CanonicalField::Deposits => DEPOSIT_SYNONYMS,
        CanonicalField::Payee => PAYEE_SYNONYMS,
        CanonicalField::ReferenceNumber => REFERENCE_SYNONYMS,
    }
}

/// Maps headers to canonical fields by common bank naming. Each header is
/// used at most once.
pub fn suggest_field_mapping(headers: &[String]) -> FieldMapping {
    let normalized: Vec<String> = headers.iter().map(|h| normalize(h)).collect();
    let mut taken = vec![false; headers.len()];
    let mut mapping = FieldMapping::new();

    for field in CanonicalField::ALL {
        let candidates = synonyms(field);
        let exact = candidates.iter().find_map(|synonym| {
            normalized
                .iter()
                .enumerate()
                .position(|(i, h)| !taken[i] && h == synonym)
        });
        // Date columns are often qualified ("Txn Posted Date").
        let fuzzy = || {
            (field == CanonicalField::Date)
                .then(|| {
                    normalized
                        .iter()
                        .enumerate()
                        .position(|(i, h)| !taken[i] && h.contains("date"))
                })
                .flatten()
        };
        if let Some(index) = exact.or_else(fuzzy) {
            taken[index] = true;
            mapping.set(field, headers[index].clone());
        } else {
            mapping.set(field, "");
        }
    }
    mapping
}

fn column_samples<'a>(rows: &'a [RawRow], header: &str) -> Vec<&'a str> {
    rows.iter()
        .filter_map(|r| r.get(header))
        .filter(|v| !is_blank(v))
        .collect()
}

/// First pattern that reads every sample, if any.
pub fn suggest_date_format(samples: &[&str]) -> Option<String> {
    if samples.is_empty() {
        return None;
    }
    DATE_PATTERNS.iter().find_map(|pattern| {
        let format = DateFormat::compile(pattern).ok()?;
        samples
            .iter()
            .all(|s| format.parse(s).is_ok())
            .then(|| pattern.to_string())
    })
}

/// First decimal convention that reads every sample, if any.
pub fn suggest_decimal_format(samples: &[&str]) -> Option<DecimalFormat> {
    if samples.is_empty() {
        return None;
    }
    DecimalFormat::ALL
        .into_iter()
        .find(|format| samples.iter().all(|s| parse_amount(s, *format, true).is_ok()))
}

/// Full mapping suggestion from headers and a sample of rows.
pub fn suggest_mapping(headers: &[String], sample: &[RawRow]) -> MappingConfig {
    let field_mapping = suggest_field_mapping(headers);

    let date_samples = field_mapping
        .header_for(CanonicalField::Date)
        .map(|h| column_samples(sample, h))
        .unwrap_or_default();

    let amount_samples: Vec<&str> = [CanonicalField::Withdrawals, CanonicalField::Deposits]
        .into_iter()
        .filter_map(|f| field_mapping.header_for(f))
        .flat_map(|h| column_samples(sample, h))
        .collect();

    MappingConfig {
        date_format: suggest_date_format(&date_samples)
            .unwrap_or_else(|| DEFAULT_DATE_PATTERN.to_string()),
        decimal_format: suggest_decimal_format(&amount_samples).unwrap_or_default(),
        strip_currency_symbols: true,
        field_mapping,
    }
}
