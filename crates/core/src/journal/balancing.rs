//! Double-entry balance checks.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::journal_errors::JournalError;
use super::journal_model::LineItem;
use crate::constants::AMOUNT_SCALE;

/// Column sums of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub debit: Decimal,
    pub credit: Decimal,
}

impl Totals {
    pub fn difference(&self) -> Decimal {
        (self.debit - self.credit).abs()
    }

    /// Balanced when the difference stays below `tolerance`. A difference of
    /// exactly one tolerance unit (500.00 vs 499.99 at 0.01) is unbalanced.
    pub fn is_balanced(&self, tolerance: Decimal) -> bool {
        self.difference() < tolerance || self.difference().is_zero()
    }
}

pub fn totals(lines: &[LineItem]) -> Totals {
    lines.iter().fold(Totals::default(), |acc, line| Totals {
        debit: acc.debit + line.debit,
        credit: acc.credit + line.credit,
    })
}

/// Checks a single line: known shape, non-negative, exactly one side set.
/// `index` is 1-based in errors.
pub fn validate_line(index: usize, line: &LineItem) -> Result<(), JournalError> {
    let invalid = |reason: &str| JournalError::InvalidLineItem {
        index: index + 1,
        reason: reason.to_string(),
    };
    if line.account_id.trim().is_empty() {
        return Err(invalid("account is required"));
    }
    if line.debit.is_sign_negative() || line.credit.is_sign_negative() {
        return Err(invalid("amounts cannot be negative"));
    }
    match (line.debit.is_zero(), line.credit.is_zero()) {
        (true, true) => return Err(invalid("either debit or credit must be set")),
        (false, false) => return Err(invalid("debit and credit cannot both be set")),
        _ => {}
    }
    let amount = line.debit.max(line.credit);
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(invalid("amounts are limited to two decimal places"));
    }
    Ok(())
}

pub fn validate_lines(lines: &[LineItem]) -> Result<(), JournalError> {
    lines
        .iter()
        .enumerate()
        .try_for_each(|(i, line)| validate_line(i, line))
}

/// Everything posting requires of the lines: valid shape, at least two of
/// them and balanced totals.
pub fn ensure_postable(lines: &[LineItem], tolerance: Decimal) -> Result<Totals, JournalError> {
    validate_lines(lines)?;
    if lines.len() < 2 {
        return Err(JournalError::EmptyEntry { lines: lines.len() });
    }
    let t = totals(lines);
    if !t.is_balanced(tolerance) {
        return Err(JournalError::UnbalancedEntry {
            total_debit: t.debit,
            total_credit: t.credit,
        });
    }
    Ok(t)
}

/// Lines of the reversing entry, in the original order.
pub fn mirror_lines(lines: &[LineItem]) -> Vec<LineItem> {
    lines.iter().map(LineItem::mirrored).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn tolerance() -> Decimal {
        dec!(0.01)
    }

    #[test]
    fn test_one_cent_off_is_unbalanced() {
        let lines = vec![
            LineItem::debit("cash", dec!(500.00)),
            LineItem::credit("sales", dec!(499.99)),
        ];
        assert_eq!(
            ensure_postable(&lines, tolerance()),
            Err(JournalError::UnbalancedEntry {
                total_debit: dec!(500.00),
                total_credit: dec!(499.99),
            })
        );
    }

    #[test]
    fn test_balanced_split_entry() {
        let lines = vec![
            LineItem::debit("cash", dec!(500.00)),
            LineItem::credit("sales", dec!(450.00)),
            LineItem::credit("tax", dec!(50)),
        ];
        let t = ensure_postable(&lines, tolerance()).unwrap();
        assert_eq!(t.debit, dec!(500));
        assert_eq!(t.credit, dec!(500));
    }

    #[test]
    fn test_single_line_is_empty_entry() {
        let lines = vec![LineItem::debit("cash", dec!(10))];
        assert_eq!(
            ensure_postable(&lines, tolerance()),
            Err(JournalError::EmptyEntry { lines: 1 })
        );
        assert_eq!(
            ensure_postable(&[], tolerance()),
            Err(JournalError::EmptyEntry { lines: 0 })
        );
    }

    #[test]
    fn test_line_shape_errors() {
        let both = LineItem {
            credit: dec!(1),
            ..LineItem::debit("cash", dec!(1))
        };
        assert!(matches!(
            validate_line(0, &both),
            Err(JournalError::InvalidLineItem { index: 1, .. })
        ));
        assert!(validate_line(0, &LineItem::debit("cash", Decimal::ZERO)).is_err());
        assert!(validate_line(0, &LineItem::debit("cash", dec!(-5))).is_err());
        assert!(validate_line(0, &LineItem::debit(" ", dec!(5))).is_err());
        assert!(validate_line(0, &LineItem::debit("cash", dec!(5.001))).is_err());
        assert!(validate_line(0, &LineItem::debit("cash", dec!(5.100))).is_ok());
    }

    fn amount() -> impl Strategy<Value = Decimal> {
        (1i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    proptest! {
        #[test]
        fn prop_mirror_swaps_totals(
            debits in prop::collection::vec(amount(), 1..6),
            credits in prop::collection::vec(amount(), 1..6),
        ) {
            let lines: Vec<LineItem> = debits
                .iter()
                .map(|d| LineItem::debit("a", *d))
                .chain(credits.iter().map(|c| LineItem::credit("b", *c)))
                .collect();
            let original = totals(&lines);
            let mirrored = totals(&mirror_lines(&lines));
            prop_assert_eq!(mirrored.debit, original.credit);
            prop_assert_eq!(mirrored.credit, original.debit);
            prop_assert_eq!(mirror_lines(&mirror_lines(&lines)), lines);
        }

        #[test]
        fn prop_postable_entries_balance_within_tolerance(
            amounts in prop::collection::vec(amount(), 1..8),
            skew in 0i64..3,
        ) {
            let total: Decimal = amounts.iter().copied().sum();
            let mut lines: Vec<LineItem> =
                amounts.iter().map(|a| LineItem::debit("a", *a)).collect();
            lines.push(LineItem::credit("b", total + Decimal::new(skew, 2)));

            match ensure_postable(&lines, tolerance()) {
                Ok(t) => {
                    prop_assert!(t.difference() < tolerance());
                    prop_assert_eq!(skew, 0);
                }
                Err(JournalError::UnbalancedEntry { .. }) => prop_assert!(skew > 0),
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }
}
