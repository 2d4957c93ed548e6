use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};
use weekly_journal_schemas::{
    parse_date, EntryId, JournalEntry, NewEntry, SummaryId, WeekRange, WeeklySummary,
};

use crate::error::{Result, StoreError};
use crate::{EntryStore, SummaryStore};

const ENTRY_COLUMNS: &str = "id, date, whatIDid, whatILearned";
const SUMMARY_COLUMNS: &str = "id, week_start, week_end, summary, created_at";

/// SQLite-backed store for journal entries and weekly summaries.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file and ensure the schema exists
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        let db = Self { conn };
        db.init_schema()?;

        info!("Database initialized");
        Ok(db)
    }

    /// Private in-memory database, mostly for tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create all tables and indexes
    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                whatIDid TEXT NOT NULL DEFAULT '',
                whatILearned TEXT NOT NULL DEFAULT ''
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_entries_date ON entries(date)",
            [],
        )?;

        // Append-only; several rows may share one week
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS weekly_summaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                week_start TEXT NOT NULL,
                week_end TEXT NOT NULL,
                summary TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_weekly_summaries_week
             ON weekly_summaries(week_start, week_end)",
            [],
        )?;

        Ok(())
    }

    /// Close the connection, reporting any error SQLite raises while doing so
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| StoreError::Storage(e))
    }

    fn row_to_entry(row: &Row) -> rusqlite::Result<JournalEntry> {
        Ok(JournalEntry {
            id: EntryId(row.get(0)?),
            date: row.get(1)?,
            what_i_did: row.get(2)?,
            what_i_learned: row.get(3)?,
        })
    }

    fn row_to_summary(row: &Row) -> rusqlite::Result<WeeklySummary> {
        Ok(WeeklySummary {
            id: SummaryId(row.get(0)?),
            week_start: row.get(1)?,
            week_end: row.get(2)?,
            summary: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn query_entries<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<JournalEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let entries = stmt
            .query_map(params, Self::row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    fn query_summaries<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<WeeklySummary>> {
        let mut stmt = self.conn.prepare(sql)?;
        let summaries = stmt
            .query_map(params, Self::row_to_summary)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(summaries)
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation(format!("missing required field `{}`", field)));
    }
    Ok(())
}

// ========== ENTRIES ==========

impl EntryStore for Database {
    fn add_entry(&self, entry: &NewEntry) -> Result<EntryId> {
        parse_date(&entry.date)?;

        self.conn.execute(
            "INSERT INTO entries (date, whatIDid, whatILearned) VALUES (?1, ?2, ?3)",
            params![entry.date, entry.what_i_did, entry.what_i_learned],
        )?;

        let id = EntryId(self.conn.last_insert_rowid());
        debug!("Inserted entry {} for {}", id, entry.date);
        Ok(id)
    }

    fn update_entry(&self, id: EntryId, entry: &NewEntry) -> Result<bool> {
        parse_date(&entry.date)?;

        let changed = self.conn.execute(
            "UPDATE entries SET date = ?1, whatIDid = ?2, whatILearned = ?3 WHERE id = ?4",
            params![entry.date, entry.what_i_did, entry.what_i_learned, id.0],
        )?;

        debug!("Updated entry {}: {} row(s)", id, changed);
        Ok(changed > 0)
    }

    fn delete_entry(&self, id: EntryId) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM entries WHERE id = ?1", params![id.0])?;

        debug!("Deleted entry {}: {} row(s)", id, changed);
        Ok(changed > 0)
    }

    fn get_entry(&self, id: EntryId) -> Result<Option<JournalEntry>> {
        let entry = self
            .conn
            .query_row(
                &format!("SELECT {} FROM entries WHERE id = ?1", ENTRY_COLUMNS),
                params![id.0],
                Self::row_to_entry,
            )
            .optional()?;

        Ok(entry)
    }

    fn list_entries(&self) -> Result<Vec<JournalEntry>> {
        self.query_entries(
            &format!(
                "SELECT {} FROM entries ORDER BY date DESC, id ASC",
                ENTRY_COLUMNS
            ),
            [],
        )
    }

    fn list_entries_in_range(&self, start: &str, end: &str) -> Result<Vec<JournalEntry>> {
        // Lexicographic comparison is only sound on zero-padded YYYY-MM-DD
        parse_date(start)?;
        parse_date(end)?;

        let entries = self.query_entries(
            &format!(
                "SELECT {} FROM entries
                 WHERE date >= ?1 AND date <= ?2
                 ORDER BY date ASC, id ASC",
                ENTRY_COLUMNS
            ),
            params![start, end],
        )?;

        debug!("Found {} entries in {}..{}", entries.len(), start, end);
        Ok(entries)
    }

    fn count_entries(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

// ========== WEEKLY SUMMARIES ==========

impl SummaryStore for Database {
    fn save_summary(
        &self,
        week_start: &str,
        week_end: &str,
        summary: &str,
    ) -> Result<WeeklySummary> {
        require_non_empty("week_start", week_start)?;
        require_non_empty("week_end", week_end)?;
        require_non_empty("summary", summary)?;
        parse_date(week_start)?;
        parse_date(week_end)?;

        let created_at = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO weekly_summaries (week_start, week_end, summary, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![week_start, week_end, summary, created_at],
        )?;

        let id = SummaryId(self.conn.last_insert_rowid());
        info!("Saved summary {} for week {}..{}", id, week_start, week_end);

        Ok(WeeklySummary {
            id,
            week_start: week_start.to_string(),
            week_end: week_end.to_string(),
            summary: summary.to_string(),
            created_at,
        })
    }

    fn get_summary(&self, id: SummaryId) -> Result<Option<WeeklySummary>> {
        let summary = self
            .conn
            .query_row(
                &format!("SELECT {} FROM weekly_summaries WHERE id = ?1", SUMMARY_COLUMNS),
                params![id.0],
                Self::row_to_summary,
            )
            .optional()?;

        Ok(summary)
    }

    fn list_summaries(&self) -> Result<Vec<WeeklySummary>> {
        self.query_summaries(
            &format!(
                "SELECT {} FROM weekly_summaries ORDER BY week_start DESC, id DESC",
                SUMMARY_COLUMNS
            ),
            [],
        )
    }

    fn summaries_for_week(&self, week: &WeekRange) -> Result<Vec<WeeklySummary>> {
        self.query_summaries(
            &format!(
                "SELECT {} FROM weekly_summaries
                 WHERE week_start = ?1 AND week_end = ?2
                 ORDER BY week_start DESC, id DESC",
                SUMMARY_COLUMNS
            ),
            params![week.start, week.end],
        )
    }

    fn count_summaries(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM weekly_summaries", [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn entry(date: &str, did: &str, learned: &str) -> NewEntry {
        NewEntry::new(date, did, learned)
    }

    #[test]
    fn test_database_creation() {
        let temp = NamedTempFile::new().unwrap();
        let db = Database::new(temp.path()).unwrap();

        assert_eq!(db.count_entries().unwrap(), 0);
        assert_eq!(db.count_summaries().unwrap(), 0);
    }

    #[test]
    fn test_entry_insert_and_retrieve() {
        let db = Database::in_memory().unwrap();

        let id = db
            .add_entry(&entry("2024-06-10", "wrote tests", "week bucketing"))
            .unwrap();

        let retrieved = db.get_entry(id).unwrap().unwrap();
        assert_eq!(retrieved.id, id);
        assert_eq!(retrieved.date, "2024-06-10");
        assert_eq!(retrieved.what_i_did, "wrote tests");
        assert_eq!(retrieved.what_i_learned, "week bucketing");
    }

    #[test]
    fn test_ids_are_monotonic() {
        let db = Database::in_memory().unwrap();

        let first = db.add_entry(&entry("2024-06-10", "a", "")).unwrap();
        let second = db.add_entry(&entry("2024-06-09", "b", "")).unwrap();
        assert!(second.0 > first.0);
    }

    #[test]
    fn test_add_rejects_unpadded_date() {
        let db = Database::in_memory().unwrap();

        let err = db.add_entry(&entry("2024-6-1", "x", "y")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidDate(_)));
        assert!(err.is_validation());
        assert_eq!(db.count_entries().unwrap(), 0);
    }

    #[test]
    fn test_update_replaces_all_fields() {
        let db = Database::in_memory().unwrap();
        let id = db.add_entry(&entry("2024-06-10", "draft", "nothing")).unwrap();

        let updated = db
            .update_entry(id, &entry("2024-06-11", "final", ""))
            .unwrap();
        assert!(updated);

        let retrieved = db.get_entry(id).unwrap().unwrap();
        assert_eq!(retrieved.date, "2024-06-11");
        assert_eq!(retrieved.what_i_did, "final");
        assert_eq!(retrieved.what_i_learned, "");
    }

    #[test]
    fn test_update_and_delete_report_missing_rows() {
        let db = Database::in_memory().unwrap();

        assert!(!db
            .update_entry(EntryId(42), &entry("2024-06-10", "x", "y"))
            .unwrap());
        assert!(!db.delete_entry(EntryId(42)).unwrap());
    }

    #[test]
    fn test_delete_then_refetch_returns_none() {
        let db = Database::in_memory().unwrap();
        let id = db.add_entry(&entry("2024-06-10", "x", "y")).unwrap();

        assert!(db.delete_entry(id).unwrap());
        assert!(db.get_entry(id).unwrap().is_none());
        assert!(!db.delete_entry(id).unwrap());
    }

    #[test]
    fn test_list_entries_newest_date_first() {
        let db = Database::in_memory().unwrap();
        let a = db.add_entry(&entry("2024-06-10", "a", "")).unwrap();
        let b = db.add_entry(&entry("2024-06-12", "b", "")).unwrap();
        let c = db.add_entry(&entry("2024-06-10", "c", "")).unwrap();

        let ids: Vec<EntryId> = db.list_entries().unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![b, a, c]);
    }

    #[test]
    fn test_range_is_inclusive_and_ascending() {
        let db = Database::in_memory().unwrap();
        db.add_entry(&entry("2024-06-09", "before", "")).unwrap();
        db.add_entry(&entry("2024-06-16", "sunday", "")).unwrap();
        db.add_entry(&entry("2024-06-10", "monday", "")).unwrap();
        db.add_entry(&entry("2024-06-13", "thursday", "")).unwrap();
        db.add_entry(&entry("2024-06-17", "after", "")).unwrap();

        let found = db
            .list_entries_in_range("2024-06-10", "2024-06-16")
            .unwrap();
        let did: Vec<&str> = found.iter().map(|e| e.what_i_did.as_str()).collect();
        assert_eq!(did, vec!["monday", "thursday", "sunday"]);
    }

    #[test]
    fn test_range_rejects_malformed_bounds() {
        let db = Database::in_memory().unwrap();
        let err = db.list_entries_in_range("2024-6-10", "2024-06-16").unwrap_err();
        assert!(matches!(err, StoreError::InvalidDate(_)));
    }

    #[test]
    fn test_save_summary_rejects_empty_fields() {
        let db = Database::in_memory().unwrap();

        let err = db.save_summary("2024-06-10", "2024-06-16", "").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = db.save_summary("", "2024-06-16", "text").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = db.save_summary("2024-06-10", "  ", "text").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        assert_eq!(db.count_summaries().unwrap(), 0);
    }

    #[test]
    fn test_summaries_are_append_only() {
        let db = Database::in_memory().unwrap();

        let first = db.save_summary("2024-06-10", "2024-06-16", "one").unwrap();
        let second = db.save_summary("2024-06-10", "2024-06-16", "two").unwrap();
        assert_ne!(first.id, second.id);

        let week = WeekRange::new("2024-06-10", "2024-06-16");
        let matches = db.summaries_for_week(&week).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].summary, "two");
        assert_eq!(matches[1].summary, "one");
    }

    #[test]
    fn test_list_summaries_newest_week_first() {
        let db = Database::in_memory().unwrap();
        db.save_summary("2024-06-03", "2024-06-09", "older").unwrap();
        db.save_summary("2024-06-10", "2024-06-16", "newer").unwrap();

        let summaries = db.list_summaries().unwrap();
        assert_eq!(summaries[0].summary, "newer");
        assert_eq!(summaries[1].summary, "older");
    }

    #[test]
    fn test_saved_summary_has_created_at() {
        let db = Database::in_memory().unwrap();
        let saved = db.save_summary("2024-06-10", "2024-06-16", "text").unwrap();

        let summary = db.get_summary(saved.id).unwrap().unwrap();
        assert_eq!(summary, saved);
        assert!(chrono::DateTime::parse_from_rfc3339(&summary.created_at).is_ok());
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let temp = NamedTempFile::new().unwrap();

        {
            let db = Database::new(temp.path()).unwrap();
            db.add_entry(&entry("2024-06-10", "persisted", "")).unwrap();
            db.close().unwrap();
        }

        let db = Database::new(temp.path()).unwrap();
        assert_eq!(db.count_entries().unwrap(), 1);
    }
}
