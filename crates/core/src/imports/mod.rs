//! Statement import pipeline: reading, header detection, field mapping,
//! format normalization, deduplication and batch commit.

mod content_hash;
mod field_mapping;
mod header_detection;
mod imports_errors;
mod imports_model;
mod imports_service;
mod imports_traits;
mod mapping_suggestion;
mod materializer;
mod normalizer;
mod statement_reader;


pub use content_hash::compute_content_hash;
pub use field_mapping::{resolve, CanonicalField, ExtractedRow, FieldMapping, MappingConfig, RowExtractor};
pub use header_detection::{detect_header_row, normalize_headers};
pub use imports_errors::ImportError;
pub use imports_model::{
    CommitCounts, ImportBatch, ImportBatchStatus, ImportPreview, ImportSummary, MappedPreview,
    NewImportBatch, RawCell, RawRow, RowIssue,
};
pub use imports_service::ImportService;
pub use imports_traits::{ImportRepositoryTrait, ImportServiceTrait};
pub use mapping_suggestion::suggest_mapping;
pub use materializer::{materialize_row, materialize_rows, RowOutcome};
pub use normalizer::{parse_amount, DateFormat, DecimalFormat, FormatError, ParsedAmount};
pub use statement_reader::{read_statement, ParsedStatement, ReadLimits, StatementKind, StatementSource};
