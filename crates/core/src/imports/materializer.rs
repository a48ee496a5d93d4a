//! Turns raw rows into transaction candidates under a resolved mapping.

use log::warn;
use rust_decimal::Decimal;

use super::content_hash::compute_content_hash;
use super::field_mapping::{CanonicalField, RowExtractor};
use super::imports_errors::ImportError;
use super::imports_model::{RawRow, RowIssue};
use super::normalizer::parse_amount;
use crate::transactions::{TransactionCandidate, TransactionType};

/// What became of one raw row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Candidate(Box<TransactionCandidate>),
    Skipped(RowIssue),
}

struct Amount {
    value: Option<Decimal>,
    flipped: bool,
}

fn read_amount(
    extractor: &RowExtractor,
    row_number: usize,
    field: CanonicalField,
    raw: Option<&str>,
) -> Result<Amount, ImportError> {
    let Some(raw) = raw else {
        return Ok(Amount {
            value: None,
            flipped: false,
        });
    };
    let parsed = parse_amount(
        raw,
        extractor.decimal_format(),
        extractor.strip_currency_symbols(),
    )
    .map_err(|e| ImportError::InvalidAmount {
        row: row_number,
        field: field.as_str().to_string(),
        raw: raw.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Amount {
        value: Some(parsed.value).filter(|v| !v.is_zero()),
        flipped: parsed.negative,
    })
}

/// Builds the candidate for `row`, or the reason it is skipped.
pub fn materialize_row(extractor: &RowExtractor, account_id: &str, row: &RawRow) -> RowOutcome {
    match try_materialize(extractor, account_id, row) {
        Ok(candidate) => RowOutcome::Candidate(Box::new(candidate)),
        Err(issue) => RowOutcome::Skipped(issue),
    }
}

fn try_materialize(
    extractor: &RowExtractor,
    account_id: &str,
    row: &RawRow,
) -> Result<TransactionCandidate, RowIssue> {
    let cells = extractor.extract(row);
    let row_number = cells.row_number;

    let raw_date = cells
        .date
        .ok_or_else(|| RowIssue::missing(row_number, CanonicalField::Date.as_str()))?;
    let date = extractor.date_format().parse(raw_date).map_err(|e| {
        RowIssue::from(ImportError::InvalidDate {
            row: row_number,
            raw: raw_date.to_string(),
            reason: e.to_string(),
        })
    })?;

    let withdrawal = read_amount(
        extractor,
        row_number,
        CanonicalField::Withdrawals,
        cells.withdrawals,
    )?;
    let deposit = read_amount(extractor, row_number, CanonicalField::Deposits, cells.deposits)?;

    let (amount, transaction_type) = match (withdrawal.value, deposit.value) {
        (Some(w), None) => (-w, TransactionType::Debit),
        (None, Some(d)) => (d, TransactionType::Credit),
        (None, None) => return Err(RowIssue::missing(row_number, "amount")),
        (Some(_), Some(_)) => {
            return Err(RowIssue::from(ImportError::InvalidAmount {
                row: row_number,
                field: CanonicalField::Withdrawals.as_str().to_string(),
                raw: format!(
                    "{} / {}",
                    cells.withdrawals.unwrap_or_default(),
                    cells.deposits.unwrap_or_default()
                ),
                reason: "row carries both a withdrawal and a deposit".to_string(),
            }))
        }
    };

    let flipped_field = match transaction_type {
        TransactionType::Debit if withdrawal.flipped => Some(CanonicalField::Withdrawals),
        TransactionType::Credit if deposit.flipped => Some(CanonicalField::Deposits),
        _ => None,
    };
    let review_reason = flipped_field.map(|field| {
        warn!(
            "Row {}: negative {} value taken as its absolute amount",
            row_number, field
        );
        format!(
            "Negative {} value was converted to its absolute amount",
            field
        )
    });

    let description = cells
        .description
        .map(|d| d.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    let reference_number = cells.reference_number.map(str::to_string);
    let content_hash = compute_content_hash(
        account_id,
        date,
        &description,
        amount,
        reference_number.as_deref(),
    );

    Ok(TransactionCandidate {
        row_number,
        date,
        description,
        payee: cells.payee.map(str::to_string),
        reference_number,
        withdrawal: withdrawal.value,
        deposit: deposit.value,
        amount,
        transaction_type,
        content_hash,
        needs_review: review_reason.is_some(),
        review_reason,
        raw_row: row.clone(),
    })
}

/// Materializes every row, keeping file order.
pub fn materialize_rows(
    extractor: &RowExtractor,
    account_id: &str,
    rows: &[RawRow],
) -> (Vec<TransactionCandidate>, Vec<RowIssue>) {
    let mut candidates = Vec::with_capacity(rows.len());
    let mut issues = Vec::new();
    for row in rows {
        match materialize_row(extractor, account_id, row) {
            RowOutcome::Candidate(candidate) => candidates.push(*candidate),
            RowOutcome::Skipped(issue) => issues.push(issue),
        }
    }
    (candidates, issues)
}
