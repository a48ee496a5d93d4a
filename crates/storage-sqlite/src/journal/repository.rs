use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::SqliteConnection;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::{entry_sequences, journal_entries, journal_line_items};
use crate::utils::{chunk_for_sqlite, decimal_to_db};

use super::model::{JournalEntryDB, JournalLineDB};
use ledgerkeep_core::journal::{
    ensure_postable, format_entry_number, EntryStatus, JournalEntry, JournalError, JournalFilter,
    JournalRepositoryTrait, LineItem,
};
use ledgerkeep_core::{Error, Result};

pub struct JournalRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl JournalRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

/// Attaches line items to loaded headers, keeping header order.
fn with_lines(
    conn: &mut SqliteConnection,
    headers: Vec<JournalEntryDB>,
) -> Result<Vec<JournalEntry>> {
    let ids: Vec<String> = headers.iter().map(|h| h.id.clone()).collect();
    let mut lines_by_entry: HashMap<String, Vec<LineItem>> = HashMap::new();
    for chunk in chunk_for_sqlite(&ids) {
        let lines = journal_line_items::table
            .filter(journal_line_items::entry_id.eq_any(chunk))
            .order((journal_line_items::entry_id, journal_line_items::line_no))
            .select(JournalLineDB::as_select())
            .load::<JournalLineDB>(conn)
            .into_core()?;
        for line in lines {
            let entry_id = line.entry_id.clone();
            lines_by_entry
                .entry(entry_id)
                .or_default()
                .push(LineItem::try_from(line)?);
        }
    }

    headers
        .into_iter()
        .map(|header| {
            let lines = lines_by_entry.remove(&header.id).unwrap_or_default();
            header.into_domain(lines)
        })
        .collect()
}

fn load_entry(conn: &mut SqliteConnection, entry_id: &str) -> Result<JournalEntry> {
    let header = journal_entries::table
        .find(entry_id)
        .select(JournalEntryDB::as_select())
        .first::<JournalEntryDB>(conn)
        .optional()
        .into_core()?
        .ok_or_else(|| Error::not_found("Journal entry", entry_id))?;
    with_lines(conn, vec![header])?
        .pop()
        .ok_or_else(|| Error::not_found("Journal entry", entry_id))
}

/// Loads the entry and checks it still carries `expected_version`.
fn load_current(
    conn: &mut SqliteConnection,
    entry_id: &str,
    expected_version: i32,
) -> Result<JournalEntry> {
    let entry = load_entry(conn, entry_id)?;
    if entry.version != expected_version {
        return Err(JournalError::ConcurrentUpdate(entry_id.to_string()).into());
    }
    Ok(entry)
}

/// Next number in the per-prefix sequence. Only called on the writer, so
/// read-then-write cannot race.
fn next_entry_number(conn: &mut SqliteConnection, prefix: &str) -> Result<String> {
    let last = entry_sequences::table
        .find(prefix)
        .select(entry_sequences::last_value)
        .first::<i64>(conn)
        .optional()
        .into_core()?;
    let next = last.unwrap_or(0) + 1;
    let written = match last {
        Some(_) => diesel::update(entry_sequences::table.find(prefix))
            .set(entry_sequences::last_value.eq(next))
            .execute(conn),
        None => diesel::insert_into(entry_sequences::table)
            .values((
                entry_sequences::prefix.eq(prefix),
                entry_sequences::last_value.eq(next),
            ))
            .execute(conn),
    };
    written.into_core()?;
    Ok(format_entry_number(prefix, next))
}

fn insert_entry(conn: &mut SqliteConnection, entry: &JournalEntry) -> Result<()> {
    diesel::insert_into(journal_entries::table)
        .values(JournalEntryDB::from(entry))
        .execute(conn)
        .into_core()?;
    insert_lines(conn, entry)
}

fn insert_lines(conn: &mut SqliteConnection, entry: &JournalEntry) -> Result<()> {
    diesel::insert_into(journal_line_items::table)
        .values(JournalLineDB::for_entry(entry))
        .execute(conn)
        .into_core()?;
    Ok(())
}

#[async_trait]
impl JournalRepositoryTrait for JournalRepository {
    fn get_by_id(&self, entry_id: &str) -> Result<JournalEntry> {
        let mut conn = get_connection(&self.pool)?;
        load_entry(&mut conn, entry_id)
    }

    /// Entries newest first.
    fn list(&self, filter: &JournalFilter) -> Result<Vec<JournalEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = journal_entries::table.into_boxed();

        if let Some(status) = filter.status {
            query = query.filter(journal_entries::status.eq(status.as_str()));
        }
        if let Some(source) = filter.source {
            query = query.filter(journal_entries::source.eq(source.as_str()));
        }
        if let Some(account_id) = &filter.account_id {
            query = query.filter(
                journal_entries::id.eq_any(
                    journal_line_items::table
                        .filter(journal_line_items::account_id.eq(account_id))
                        .select(journal_line_items::entry_id),
                ),
            );
        }
        if let Some(start) = filter.start_date {
            query = query.filter(journal_entries::date.ge(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(journal_entries::date.le(end));
        }

        let headers = query
            .select(JournalEntryDB::as_select())
            .order((
                journal_entries::date.desc(),
                journal_entries::created_at.desc(),
                journal_entries::id.desc(),
            ))
            .load::<JournalEntryDB>(&mut conn)
            .into_core()?;
        with_lines(&mut conn, headers)
    }

    async fn create(&self, mut entry: JournalEntry, number_prefix: &str) -> Result<JournalEntry> {
        let prefix = number_prefix.to_string();
        self.writer
            .exec(move |conn| {
                entry.entry_number = next_entry_number(conn, &prefix)?;
                insert_entry(conn, &entry)?;
                Ok(entry)
            })
            .await
    }

    async fn update_draft(
        &self,
        mut entry: JournalEntry,
        expected_version: i32,
    ) -> Result<JournalEntry> {
        self.writer
            .exec(move |conn| {
                let stored = load_current(conn, &entry.id, expected_version)?;
                stored.ensure_draft("edit")?;

                entry.entry_number = stored.entry_number;
                entry.created_at = stored.created_at;
                entry.version = expected_version + 1;
                entry.refresh_totals();

                diesel::update(journal_entries::table.find(&entry.id))
                    .set((
                        journal_entries::date.eq(entry.date),
                        journal_entries::description.eq(&entry.description),
                        journal_entries::reference.eq(&entry.reference),
                        journal_entries::currency.eq(&entry.currency),
                        journal_entries::total_debit.eq(decimal_to_db(entry.total_debit)),
                        journal_entries::total_credit.eq(decimal_to_db(entry.total_credit)),
                        journal_entries::version.eq(entry.version),
                        journal_entries::updated_at.eq(entry.updated_at),
                    ))
                    .execute(conn)
                    .into_core()?;

                diesel::delete(
                    journal_line_items::table.filter(journal_line_items::entry_id.eq(&entry.id)),
                )
                .execute(conn)
                .into_core()?;
                insert_lines(conn, &entry)?;

                Ok(entry)
            })
            .await
    }

    async fn delete_draft(&self, entry_id: &str) -> Result<()> {
        let entry_id = entry_id.to_string();
        self.writer
            .exec(move |conn| {
                let stored = load_entry(conn, &entry_id)?;
                stored.ensure_draft("delete")?;
                diesel::delete(
                    journal_line_items::table.filter(journal_line_items::entry_id.eq(&entry_id)),
                )
                .execute(conn)
                .into_core()?;
                diesel::delete(journal_entries::table.find(&entry_id))
                    .execute(conn)
                    .into_core()?;
                Ok(())
            })
            .await
    }

    /// Re-checks status, version and balance on the writer before flipping
    /// the entry to posted.
    async fn post(
        &self,
        entry_id: &str,
        expected_version: i32,
        tolerance: Decimal,
        posted_at: NaiveDateTime,
    ) -> Result<JournalEntry> {
        let entry_id = entry_id.to_string();
        self.writer
            .exec(move |conn| {
                let mut entry = load_current(conn, &entry_id, expected_version)?;
                entry.ensure_draft("post")?;
                ensure_postable(&entry.line_items, tolerance)?;

                entry.status = EntryStatus::Posted;
                entry.posted_at = Some(posted_at);
                entry.version += 1;
                entry.updated_at = posted_at;
                entry.refresh_totals();

                diesel::update(journal_entries::table.find(&entry_id))
                    .set((
                        journal_entries::status.eq(entry.status.as_str()),
                        journal_entries::posted_at.eq(entry.posted_at),
                        journal_entries::total_debit.eq(decimal_to_db(entry.total_debit)),
                        journal_entries::total_credit.eq(decimal_to_db(entry.total_credit)),
                        journal_entries::version.eq(entry.version),
                        journal_entries::updated_at.eq(entry.updated_at),
                    ))
                    .execute(conn)
                    .into_core()?;
                Ok(entry)
            })
            .await
    }

    /// Stores the mirror and marks the original reversed. The original's lines
    /// and totals are left as they were.
    async fn reverse(
        &self,
        original_id: &str,
        expected_version: i32,
        mut mirror: JournalEntry,
        number_prefix: &str,
    ) -> Result<JournalEntry> {
        let original_id = original_id.to_string();
        let prefix = number_prefix.to_string();
        self.writer
            .exec(move |conn| {
                let original = load_current(conn, &original_id, expected_version)?;
                original.ensure_reversible()?;

                mirror.entry_number = next_entry_number(conn, &prefix)?;
                insert_entry(conn, &mirror)?;

                diesel::update(journal_entries::table.find(&original_id))
                    .set((
                        journal_entries::status.eq(EntryStatus::Reversed.as_str()),
                        journal_entries::reversed_by.eq(Some(&mirror.id)),
                        journal_entries::reversal_reason.eq(&mirror.reversal_reason),
                        journal_entries::version.eq(original.version + 1),
                        journal_entries::updated_at.eq(mirror.created_at),
                    ))
                    .execute(conn)
                    .into_core()?;

                Ok(mirror)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestDb;
    use chrono::NaiveDate;
    use ledgerkeep_core::journal::{mirror_lines, EntrySource};
    use rust_decimal_macros::dec;

    const PREFIX: &str = "JE-";

    fn tolerance() -> Decimal {
        dec!(0.01)
    }

    fn draft(id: &str, day: u32, lines: Vec<LineItem>) -> JournalEntry {
        let now = chrono::Utc::now().naive_utc();
        let mut entry = JournalEntry {
            id: id.to_string(),
            entry_number: String::new(),
            date: NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
            description: "Office rent".to_string(),
            reference: None,
            source: EntrySource::Manual,
            status: EntryStatus::Draft,
            currency: "USD".to_string(),
            line_items: lines,
            total_debit: Decimal::ZERO,
            total_credit: Decimal::ZERO,
            reversal_of: None,
            reversed_by: None,
            reversal_reason: None,
            version: 1,
            posted_at: None,
            created_at: now,
            updated_at: now,
        };
        entry.refresh_totals();
        entry
    }

    fn rent_lines(amount: Decimal) -> Vec<LineItem> {
        vec![LineItem::debit("rent", amount), LineItem::credit("bank", amount)]
    }

    async fn setup() -> (TestDb, JournalRepository) {
        let db = TestDb::with_accounts(&["bank", "rent", "cash"]).await;
        let repo = JournalRepository::new(db.pool.clone(), db.writer.clone());
        (db, repo)
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_numbers() {
        let (_db, repo) = setup().await;
        let first = repo
            .create(draft("je-1", 2, rent_lines(dec!(990))), PREFIX)
            .await
            .unwrap();
        let second = repo
            .create(draft("je-2", 3, rent_lines(dec!(10))), PREFIX)
            .await
            .unwrap();
        assert_eq!(first.entry_number, "JE-00001");
        assert_eq!(second.entry_number, "JE-00002");

        let loaded = repo.get_by_id("je-1").unwrap();
        assert_eq!(loaded.line_items, rent_lines(dec!(990)));
        assert_eq!(loaded.total_debit, dec!(990));
        assert!(repo.get_by_id("je-9").unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_draft_replaces_lines_and_bumps_version() {
        let (_db, repo) = setup().await;
        let created = repo
            .create(draft("je-1", 2, rent_lines(dec!(990))), PREFIX)
            .await
            .unwrap();

        let mut edited = created.clone();
        edited.line_items = vec![
            LineItem::debit("rent", dec!(900)),
            LineItem::debit("rent", dec!(90)),
            LineItem::credit("cash", dec!(990)),
        ];
        let updated = repo.update_draft(edited.clone(), 1).await.unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.entry_number, "JE-00001");

        let loaded = repo.get_by_id("je-1").unwrap();
        assert_eq!(loaded.line_items.len(), 3);
        assert_eq!(loaded.line_items[2].account_id, "cash");

        let err = repo.update_draft(edited, 1).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Journal(JournalError::ConcurrentUpdate(_))
        ));
    }

    #[tokio::test]
    async fn test_post_rechecks_balance_and_version() {
        let (_db, repo) = setup().await;
        let unbalanced = draft(
            "je-1",
            2,
            vec![
                LineItem::debit("rent", dec!(500.00)),
                LineItem::credit("bank", dec!(499.99)),
            ],
        );
        repo.create(unbalanced, PREFIX).await.unwrap();
        let now = chrono::Utc::now().naive_utc();

        let err = repo.post("je-1", 1, tolerance(), now).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Journal(JournalError::UnbalancedEntry { .. })
        ));
        assert_eq!(repo.get_by_id("je-1").unwrap().status, EntryStatus::Draft);

        repo.create(draft("je-2", 3, rent_lines(dec!(990))), PREFIX)
            .await
            .unwrap();
        let err = repo.post("je-2", 7, tolerance(), now).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Journal(JournalError::ConcurrentUpdate(_))
        ));

        let posted = repo.post("je-2", 1, tolerance(), now).await.unwrap();
        assert_eq!(posted.status, EntryStatus::Posted);
        assert_eq!(posted.version, 2);
        assert!(repo.get_by_id("je-2").unwrap().posted_at.is_some());

        let err = repo.delete_draft("je-2").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Journal(JournalError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_reverse_marks_original_and_stores_mirror() {
        let (_db, repo) = setup().await;
        repo.create(draft("je-1", 2, rent_lines(dec!(990))), PREFIX)
            .await
            .unwrap();
        let posted = repo
            .post("je-1", 1, tolerance(), chrono::Utc::now().naive_utc())
            .await
            .unwrap();

        let mut mirror = draft("je-2", 2, mirror_lines(&posted.line_items));
        mirror.status = EntryStatus::Posted;
        mirror.reversal_of = Some("je-1".to_string());
        mirror.reversal_reason = Some("Duplicate invoice".to_string());
        mirror.posted_at = Some(mirror.created_at);

        let stored = repo
            .reverse("je-1", posted.version, mirror, PREFIX)
            .await
            .unwrap();
        assert_eq!(stored.entry_number, "JE-00002");

        let original = repo.get_by_id("je-1").unwrap();
        assert_eq!(original.status, EntryStatus::Reversed);
        assert_eq!(original.reversed_by.as_deref(), Some("je-2"));
        assert_eq!(original.line_items, rent_lines(dec!(990)));

        let reloaded = repo.get_by_id("je-2").unwrap();
        assert_eq!(reloaded.line_items[0], LineItem::credit("rent", dec!(990)));
        assert_eq!(reloaded.reversal_of.as_deref(), Some("je-1"));

        let err = repo
            .reverse("je-1", original.version, draft("je-3", 2, Vec::new()), PREFIX)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Journal(JournalError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_account_and_status() {
        let (_db, repo) = setup().await;
        repo.create(draft("je-1", 2, rent_lines(dec!(990))), PREFIX)
            .await
            .unwrap();
        repo.create(
            draft(
                "je-2",
                5,
                vec![
                    LineItem::debit("cash", dec!(50)),
                    LineItem::credit("bank", dec!(50)),
                ],
            ),
            PREFIX,
        )
        .await
        .unwrap();
        repo.post("je-2", 1, tolerance(), chrono::Utc::now().naive_utc())
            .await
            .unwrap();

        let all = repo.list(&JournalFilter::default()).unwrap();
        let ids: Vec<_> = all.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["je-2", "je-1"]);

        let cash = repo
            .list(&JournalFilter {
                account_id: Some("cash".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(cash.len(), 1);
        assert_eq!(cash[0].line_items.len(), 2);

        let drafts = repo
            .list(&JournalFilter {
                status: Some(EntryStatus::Draft),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, "je-1");
    }
}
