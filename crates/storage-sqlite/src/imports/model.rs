//! Database models for import batches.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use std::str::FromStr;

use crate::utils::{count_from_db, count_to_db, from_json, to_json};
use ledgerkeep_core::imports::{
    ImportBatch, ImportBatchStatus, MappingConfig, NewImportBatch, RawCell, RawRow,
};
use ledgerkeep_core::Result;

/// Headers, source, mapping and skipped rows are stored as JSON text.
#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::import_batches)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ImportBatchDB {
    pub id: String,
    pub account_id: String,
    pub file_name: String,
    pub source: String,
    pub headers: String,
    pub header_row_number: i32,
    pub mapping: Option<String>,
    pub status: String,
    pub total_rows: i32,
    pub committed_count: i32,
    pub skipped_count: i32,
    pub duplicate_count: i32,
    pub flagged_count: i32,
    pub skipped_rows: String,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ImportBatchDB {
    pub fn from_new(id: String, batch: &NewImportBatch, now: NaiveDateTime) -> Result<Self> {
        Ok(Self {
            id,
            account_id: batch.account_id.clone(),
            file_name: batch.file_name.clone(),
            source: to_json(&batch.source)?,
            headers: to_json(&batch.headers)?,
            header_row_number: count_to_db(batch.header_row_number),
            mapping: None,
            status: ImportBatchStatus::Uploaded.as_str().to_string(),
            total_rows: count_to_db(batch.rows.len()),
            committed_count: 0,
            skipped_count: 0,
            duplicate_count: 0,
            flagged_count: 0,
            skipped_rows: "[]".to_string(),
            error_message: None,
            created_at: now,
            updated_at: now,
        })
    }
}

impl TryFrom<ImportBatchDB> for ImportBatch {
    type Error = ledgerkeep_core::Error;

    fn try_from(db: ImportBatchDB) -> Result<Self> {
        Ok(Self {
            source: from_json(&db.source)?,
            headers: from_json(&db.headers)?,
            mapping: db
                .mapping
                .as_deref()
                .map(from_json::<MappingConfig>)
                .transpose()?,
            status: ImportBatchStatus::from_str(&db.status)?,
            skipped_rows: from_json(&db.skipped_rows)?,
            header_row_number: count_from_db(db.header_row_number),
            total_rows: count_from_db(db.total_rows),
            committed_count: count_from_db(db.committed_count),
            skipped_count: count_from_db(db.skipped_count),
            duplicate_count: count_from_db(db.duplicate_count),
            flagged_count: count_from_db(db.flagged_count),
            id: db.id,
            account_id: db.account_id,
            file_name: db.file_name,
            error_message: db.error_message,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

/// One uploaded row; `cells` is the JSON list of header/value pairs.
#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::import_rows)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ImportRowDB {
    pub batch_id: String,
    pub row_number: i32,
    pub cells: String,
}

impl ImportRowDB {
    pub fn from_raw(batch_id: &str, row: &RawRow) -> Result<Self> {
        Ok(Self {
            batch_id: batch_id.to_string(),
            row_number: count_to_db(row.row_number),
            cells: to_json(&row.cells)?,
        })
    }
}

impl TryFrom<ImportRowDB> for RawRow {
    type Error = ledgerkeep_core::Error;

    fn try_from(db: ImportRowDB) -> Result<Self> {
        Ok(Self {
            row_number: count_from_db(db.row_number),
            cells: from_json::<Vec<RawCell>>(&db.cells)?,
        })
    }
}

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::account_mappings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AccountMappingDB {
    pub account_id: String,
    pub mapping: String,
    pub updated_at: NaiveDateTime,
}
