//! Locale-aware conversion of raw statement cells into dates and amounts.
//!
//! Every function here is pure. Configuration comes in as a compiled
//! [`DateFormat`] or a [`DecimalFormat`]; nothing is inferred from the value
//! being parsed, so a cell that does not match its configured format is an
//! error rather than a guess.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Why a cell could not be normalized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unsupported date pattern '{0}'")]
    UnsupportedDatePattern(String),

    #[error("Unsupported decimal format '{0}'")]
    UnsupportedDecimalFormat(String),

    #[error("{0}")]
    Date(String),

    #[error("{0}")]
    Amount(String),
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// A user date pattern such as `dd-MM-yyyy`, `MM/dd/yy` or `dd MMM yyyy`,
/// compiled to a chrono format string.
///
/// Tokens: `d`/`dd` day, `M`/`MM` month number, `MMM`/`MMMM` month name,
/// `yy` two-digit year (`24` reads as 2024, `98` as 1998), `yyyy` four-digit
/// year. Separators may be any of ` -/.,`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pattern: String,
    chrono_format: String,
    four_digit_year: bool,
    words: usize,
}

impl DateFormat {
    pub fn compile(pattern: &str) -> Result<Self, FormatError> {
        let unsupported = || FormatError::UnsupportedDatePattern(pattern.to_string());
        let chars: Vec<char> = pattern.trim().chars().collect();
        if chars.is_empty() {
            return Err(unsupported());
        }

        let mut chrono_format = String::new();
        let (mut day, mut month, mut year) = (false, false, false);
        let mut four_digit_year = false;
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let run = chars[i..].iter().take_while(|&&x| x == c).count();
            match c {
                'd' if run <= 2 && !day => {
                    chrono_format.push_str("%d");
                    day = true;
                }
                'M' if run <= 2 && !month => {
                    chrono_format.push_str("%m");
                    month = true;
                }
                'M' if run <= 4 && !month => {
                    chrono_format.push_str("%B");
                    month = true;
                }
                'y' if run == 2 && !year => {
                    chrono_format.push_str("%y");
                    year = true;
                }
                'y' if run == 4 && !year => {
                    chrono_format.push_str("%Y");
                    year = true;
                    four_digit_year = true;
                }
                ' ' | '-' | '/' | '.' | ',' => {
                    for _ in 0..run {
                        chrono_format.push(c);
                    }
                }
                _ => return Err(unsupported()),
            }
            i += run;
        }

        if !(day && month && year) {
            return Err(unsupported());
        }

        Ok(Self {
            pattern: pattern.trim().to_string(),
            chrono_format,
            four_digit_year,
            words: pattern.split_whitespace().count(),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Parses `raw` strictly against the pattern.
    ///
    /// A trailing time component (`02-04-2024 10:15` or `2024-04-02T10:15`)
    /// is ignored. When the pattern does not match, an ISO `yyyy-MM-dd` value
    /// is still accepted since it cannot be read two ways.
    pub fn parse(&self, raw: &str) -> Result<NaiveDate, FormatError> {
        let value = strip_time(raw.trim(), self.words);
        if value.is_empty() {
            return Err(FormatError::Date("date is empty".to_string()));
        }

        match NaiveDate::parse_from_str(&value, &self.chrono_format) {
            Ok(date) if self.four_digit_year && date.year() < 1000 => Err(FormatError::Date(
                format!("'{}' does not carry a four-digit year", raw.trim()),
            )),
            Ok(date) => Ok(date),
            Err(e) => parse_iso(&value).ok_or_else(|| {
                FormatError::Date(format!(
                    "'{}' does not match date format '{}': {}",
                    raw.trim(),
                    self.pattern,
                    e
                ))
            }),
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn strip_time(value: &str, words: usize) -> String {
    let head = value
        .split_whitespace()
        .take(words.max(1))
        .collect::<Vec<_>>()
        .join(" ");
    let bytes = head.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'T'
            && i > 0
            && bytes[i - 1].is_ascii_digit()
            && bytes.get(i + 1).is_some_and(|n| n.is_ascii_digit())
        {
            return head[..i].to_string();
        }
    }
    head
}

fn parse_iso(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Decimal and thousands separator convention, identified by how it writes
/// one million two hundred thirty-four thousand five hundred sixty-seven and
/// eighty-nine hundredths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecimalFormat {
    #[default]
    #[serde(rename = "1234567.89")]
    Plain,
    #[serde(rename = "1,234,567.89")]
    CommaGrouped,
    #[serde(rename = "12,34,567.89")]
    Indian,
    #[serde(rename = "1.234.567,89")]
    DotGrouped,
    #[serde(rename = "1 234 567,89")]
    SpaceGrouped,
    #[serde(rename = "1234567,89")]
    PlainComma,
}

impl DecimalFormat {
    pub const ALL: [DecimalFormat; 6] = [
        DecimalFormat::Plain,
        DecimalFormat::CommaGrouped,
        DecimalFormat::Indian,
        DecimalFormat::DotGrouped,
        DecimalFormat::SpaceGrouped,
        DecimalFormat::PlainComma,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DecimalFormat::Plain => "1234567.89",
            DecimalFormat::CommaGrouped => "1,234,567.89",
            DecimalFormat::Indian => "12,34,567.89",
            DecimalFormat::DotGrouped => "1.234.567,89",
            DecimalFormat::SpaceGrouped => "1 234 567,89",
            DecimalFormat::PlainComma => "1234567,89",
        }
    }

    fn decimal_separator(&self) -> char {
        match self {
            DecimalFormat::Plain | DecimalFormat::CommaGrouped | DecimalFormat::Indian => '.',
            _ => ',',
        }
    }

    fn is_group_separator(&self, c: char) -> bool {
        match self {
            DecimalFormat::CommaGrouped | DecimalFormat::Indian => c == ',',
            DecimalFormat::DotGrouped => c == '.',
            DecimalFormat::SpaceGrouped => c == ' ' || c == '\u{a0}' || c == '\u{202f}',
            DecimalFormat::Plain | DecimalFormat::PlainComma => false,
        }
    }

    fn groups_valid(&self, groups: &[&str]) -> bool {
        let (first, rest) = match groups.split_first() {
            Some(split) => split,
            None => return false,
        };
        if first.is_empty() || rest.is_empty() {
            return !first.is_empty();
        }
        match self {
            DecimalFormat::Indian => {
                let (last, middle) = match rest.split_last() {
                    Some(split) => split,
                    None => return false,
                };
                last.len() == 3 && first.len() <= 2 && middle.iter().all(|g| g.len() == 2)
            }
            _ => first.len() <= 3 && rest.iter().all(|g| g.len() == 3),
        }
    }
}

impl fmt::Display for DecimalFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecimalFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DecimalFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| FormatError::UnsupportedDecimalFormat(s.to_string()))
    }
}

/// A parsed amount as a magnitude plus an explicit sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedAmount {
    pub value: Decimal,
    pub negative: bool,
}

impl ParsedAmount {
    pub fn signed(&self) -> Decimal {
        if self.negative {
            -self.value
        } else {
            self.value
        }
    }
}

/// Parses an amount cell under `format`.
///
/// Leading or trailing `-` and surrounding parentheses mark a negative value.
/// With `strip_currency`, symbols and codes before the first digit and after
/// the last digit are dropped (`$1,200.00`, `1.200,00 €`, `INR 12,000`).
pub fn parse_amount(
    raw: &str,
    format: DecimalFormat,
    strip_currency: bool,
) -> Result<ParsedAmount, FormatError> {
    let trimmed = raw.trim();
    let fail = |why: &str| FormatError::Amount(format!("'{}' {}", trimmed, why));

    let first = trimmed
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| fail("contains no digits"))?;
    let last = trimmed
        .rfind(|c: char| c.is_ascii_digit())
        .ok_or_else(|| fail("contains no digits"))?;

    // A decimal separator right before the first digit (".50") belongs to the number.
    let mut start = first;
    if let Some(prev) = trimmed[..first].chars().next_back() {
        if prev == format.decimal_separator() {
            start = first - prev.len_utf8();
        }
    }
    let prefix = &trimmed[..start];
    let core = &trimmed[start..=last];
    let suffix = &trimmed[last + 1..];

    let mut minus = 0;
    let mut open = 0;
    let mut close = 0;
    for c in prefix.chars().chain(suffix.chars()) {
        match c {
            '-' => minus += 1,
            '(' => open += 1,
            ')' => close += 1,
            '+' => {}
            c if c.is_whitespace() => {}
            _ if strip_currency => {}
            _ => return Err(fail("contains unexpected characters")),
        }
    }
    let parenthesized = open == 1 && close == 1 && prefix.contains('(') && suffix.contains(')');
    if minus > 1 || (open + close > 0 && !parenthesized) || (parenthesized && minus > 0) {
        return Err(fail("has an ambiguous sign"));
    }

    let value = parse_core(core, format).map_err(|why| fail(&why))?;
    let negative = (minus == 1 || parenthesized) && !value.is_zero();
    Ok(ParsedAmount { value, negative })
}

fn parse_core(core: &str, format: DecimalFormat) -> Result<Decimal, String> {
    let separator = format.decimal_separator();
    let mut parts = core.splitn(2, separator);
    let integer = parts.next().unwrap_or_default();
    let fraction = parts.next().unwrap_or_default();

    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("does not match decimal format '{}'", format));
    }

    let groups: Vec<&str> = integer.split(|c| format.is_group_separator(c)).collect();
    if groups.len() > 1 && !format.groups_valid(&groups) {
        return Err(format!("has misplaced digit grouping for '{}'", format));
    }
    let digits: String = groups.concat();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("does not match decimal format '{}'", format));
    }
    if digits.is_empty() && fraction.is_empty() {
        return Err("contains no digits".to_string());
    }

    let normalized = format!(
        "{}.{}",
        if digits.is_empty() { "0" } else { &digits },
        if fraction.is_empty() { "0" } else { fraction }
    );
    Decimal::from_str(&normalized).map_err(|e| format!("is not a valid number: {}", e))
}

/// True when a cell carries nothing to parse.
pub fn is_blank(raw: &str) -> bool {
    raw.trim().is_empty()
}
