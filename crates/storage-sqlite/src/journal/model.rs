//! Database models for journal entries.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use std::str::FromStr;

use crate::utils::{decimal_from_db, decimal_to_db};
use ledgerkeep_core::journal::{EntrySource, EntryStatus, JournalEntry, LineItem};
use ledgerkeep_core::Result;

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::journal_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JournalEntryDB {
    pub id: String,
    pub entry_number: String,
    pub date: NaiveDate,
    pub description: String,
    pub reference: Option<String>,
    pub source: String,
    pub status: String,
    pub currency: String,
    pub total_debit: String,
    pub total_credit: String,
    pub reversal_of: Option<String>,
    pub reversed_by: Option<String>,
    pub reversal_reason: Option<String>,
    pub version: i32,
    pub posted_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<&JournalEntry> for JournalEntryDB {
    fn from(entry: &JournalEntry) -> Self {
        Self {
            id: entry.id.clone(),
            entry_number: entry.entry_number.clone(),
            date: entry.date,
            description: entry.description.clone(),
            reference: entry.reference.clone(),
            source: entry.source.as_str().to_string(),
            status: entry.status.as_str().to_string(),
            currency: entry.currency.clone(),
            total_debit: decimal_to_db(entry.total_debit),
            total_credit: decimal_to_db(entry.total_credit),
            reversal_of: entry.reversal_of.clone(),
            reversed_by: entry.reversed_by.clone(),
            reversal_reason: entry.reversal_reason.clone(),
            version: entry.version,
            posted_at: entry.posted_at,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

impl JournalEntryDB {
    pub fn into_domain(self, line_items: Vec<LineItem>) -> Result<JournalEntry> {
        Ok(JournalEntry {
            source: EntrySource::from_str(&self.source)?,
            status: EntryStatus::from_str(&self.status)?,
            total_debit: decimal_from_db(&self.total_debit, "total_debit")?,
            total_credit: decimal_from_db(&self.total_credit, "total_credit")?,
            id: self.id,
            entry_number: self.entry_number,
            date: self.date,
            description: self.description,
            reference: self.reference,
            currency: self.currency,
            line_items,
            reversal_of: self.reversal_of,
            reversed_by: self.reversed_by,
            reversal_reason: self.reversal_reason,
            version: self.version,
            posted_at: self.posted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// A line keeps its position in the entry through `line_no`.
#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::journal_line_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JournalLineDB {
    pub entry_id: String,
    pub line_no: i32,
    pub account_id: String,
    pub debit: String,
    pub credit: String,
    pub description: Option<String>,
}

impl JournalLineDB {
    pub fn for_entry(entry: &JournalEntry) -> Vec<Self> {
        entry
            .line_items
            .iter()
            .zip(1..)
            .map(|(line, line_no)| Self {
                entry_id: entry.id.clone(),
                line_no,
                account_id: line.account_id.clone(),
                debit: decimal_to_db(line.debit),
                credit: decimal_to_db(line.credit),
                description: line.description.clone(),
            })
            .collect()
    }
}

impl TryFrom<JournalLineDB> for LineItem {
    type Error = ledgerkeep_core::Error;

    fn try_from(db: JournalLineDB) -> Result<Self> {
        Ok(Self {
            debit: decimal_from_db(&db.debit, "debit")?,
            credit: decimal_from_db(&db.credit, "credit")?,
            account_id: db.account_id,
            description: db.description,
        })
    }
}
