//! Field mapping: which statement column feeds which canonical field.
//!
//! The mapping is plain data (`canonical field -> header name`), validated
//! against the batch headers once and then compiled into a [`RowExtractor`]
//! that reads cells by position.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::imports_errors::ImportError;
use super::imports_model::RawRow;
use super::normalizer::{DateFormat, DecimalFormat};

/// Canonical transaction fields a statement column can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalField {
    Date,
    Description,
    Withdrawals,
    Deposits,
    Payee,
    ReferenceNumber,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 6] = [
        CanonicalField::Date,
        CanonicalField::Description,
        CanonicalField::Withdrawals,
        CanonicalField::Deposits,
        CanonicalField::Payee,
        CanonicalField::ReferenceNumber,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Date => "date",
            CanonicalField::Description => "description",
            CanonicalField::Withdrawals => "withdrawals",
            CanonicalField::Deposits => "deposits",
            CanonicalField::Payee => "payee",
            CanonicalField::ReferenceNumber => "referenceNumber",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical field to header name. An empty header means "not present".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping(BTreeMap<CanonicalField, String>);

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: CanonicalField, header: impl Into<String>) -> Self {
        self.0.insert(field, header.into());
        self
    }

    pub fn set(&mut self, field: CanonicalField, header: impl Into<String>) {
        self.0.insert(field, header.into());
    }

    /// Header feeding `field`, if one is mapped.
    pub fn header_for(&self, field: CanonicalField) -> Option<&str> {
        self.0
            .get(&field)
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
    }

    pub fn is_mapped(&self, field: CanonicalField) -> bool {
        self.header_for(field).is_some()
    }

    /// Mapped fields with their headers, skipping empty entries.
    pub fn mapped(&self) -> impl Iterator<Item = (CanonicalField, &str)> + '_ {
        CanonicalField::ALL
            .into_iter()
            .filter_map(move |f| self.header_for(f).map(|h| (f, h)))
    }
}

/// Everything needed to turn raw rows into transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingConfig {
    pub field_mapping: FieldMapping,
    pub date_format: String,
    #[serde(default)]
    pub decimal_format: DecimalFormat,
    #[serde(default = "default_true")]
    pub strip_currency_symbols: bool,
}

fn default_true() -> bool {
    true
}

impl MappingConfig {
    /// True when every header this mapping refers to exists in `headers`.
    pub fn fits_headers(&self, headers: &[String]) -> bool {
        self.field_mapping
            .mapped()
            .all(|(_, header)| find_header(headers, header).is_some())
    }
}

/// Cells of one row picked out by a resolved mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractedRow<'a> {
    pub row_number: usize,
    pub date: Option<&'a str>,
    pub description: Option<&'a str>,
    pub withdrawals: Option<&'a str>,
    pub deposits: Option<&'a str>,
    pub payee: Option<&'a str>,
    pub reference_number: Option<&'a str>,
}

/// A mapping validated against concrete headers.
#[derive(Debug, Clone)]
pub struct RowExtractor {
    columns: BTreeMap<CanonicalField, usize>,
    date_format: DateFormat,
    decimal_format: DecimalFormat,
    strip_currency_symbols: bool,
}

impl RowExtractor {
    pub fn extract<'a>(&self, row: &'a RawRow) -> ExtractedRow<'a> {
        let cell = |field: CanonicalField| {
            self.columns
                .get(&field)
                .and_then(|idx| row.value_at(*idx))
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };
        ExtractedRow {
            row_number: row.row_number,
            date: cell(CanonicalField::Date),
            description: cell(CanonicalField::Description),
            withdrawals: cell(CanonicalField::Withdrawals),
            deposits: cell(CanonicalField::Deposits),
            payee: cell(CanonicalField::Payee),
            reference_number: cell(CanonicalField::ReferenceNumber),
        }
    }

    pub fn date_format(&self) -> &DateFormat {
        &self.date_format
    }

    pub fn decimal_format(&self) -> DecimalFormat {
        self.decimal_format
    }

    pub fn strip_currency_symbols(&self) -> bool {
        self.strip_currency_symbols
    }
}

/// Header position for `name`: exact match first, then trimmed
/// case-insensitive.
fn find_header(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name).or_else(|| {
        let wanted = name.trim().to_lowercase();
        headers
            .iter()
            .position(|h| h.trim().to_lowercase() == wanted)
    })
}

/// Validates `config` against the batch headers and compiles it.
pub fn resolve(headers: &[String], config: &MappingConfig) -> Result<RowExtractor, ImportError> {
    let mapping = &config.field_mapping;

    let mut missing = Vec::new();
    for field in [CanonicalField::Date, CanonicalField::Description] {
        if !mapping.is_mapped(field) {
            missing.push(field.as_str());
        }
    }
    if !mapping.is_mapped(CanonicalField::Withdrawals) && !mapping.is_mapped(CanonicalField::Deposits)
    {
        missing.push("withdrawals or deposits");
    }
    if !missing.is_empty() {
        return Err(ImportError::IncompleteMapping(format!(
            "missing {}",
            missing.join(", ")
        )));
    }

    let mut columns = BTreeMap::new();
    for (field, header) in mapping.mapped() {
        let index = find_header(headers, header).ok_or_else(|| {
            ImportError::IncompleteMapping(format!(
                "column '{}' mapped to {} is not in the file",
                header, field
            ))
        })?;
        columns.insert(field, index);
    }

    if let (Some(w), Some(d)) = (
        columns.get(&CanonicalField::Withdrawals),
        columns.get(&CanonicalField::Deposits),
    ) {
        if w == d {
            return Err(ImportError::IncompleteMapping(
                "withdrawals and deposits cannot share a column".to_string(),
            ));
        }
    }

    let date_format = DateFormat::compile(&config.date_format)
        .map_err(|e| ImportError::IncompleteMapping(e.to_string()))?;

    Ok(RowExtractor {
        columns,
        date_format,
        decimal_format: config.decimal_format,
        strip_currency_symbols: config.strip_currency_symbols,
    })
}
