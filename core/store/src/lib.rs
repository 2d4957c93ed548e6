pub mod database;
pub mod error;

pub use database::Database;
pub use error::{Result, StoreError};

use weekly_journal_schemas::{
    EntryId, JournalEntry, NewEntry, SummaryId, WeekRange, WeeklySummary,
};

/// Durable collection of journal entries.
pub trait EntryStore: Send {
    /// Insert a new entry and return its id.
    fn add_entry(&self, entry: &NewEntry) -> Result<EntryId>;
    /// Replace date and both bodies. `false` when no row has this id.
    fn update_entry(&self, id: EntryId, entry: &NewEntry) -> Result<bool>;
    /// `false` when no row has this id.
    fn delete_entry(&self, id: EntryId) -> Result<bool>;
    fn get_entry(&self, id: EntryId) -> Result<Option<JournalEntry>>;
    /// Most recent date first; same-date entries keep insertion order.
    fn list_entries(&self) -> Result<Vec<JournalEntry>>;
    /// Entries with `start <= date <= end`, oldest date first.
    fn list_entries_in_range(&self, start: &str, end: &str) -> Result<Vec<JournalEntry>>;
    fn count_entries(&self) -> Result<usize>;
}

/// Append-only collection of weekly summaries.
pub trait SummaryStore: Send {
    /// Always inserts a new row and returns it as stored; rejects empty fields.
    fn save_summary(&self, week_start: &str, week_end: &str, summary: &str)
        -> Result<WeeklySummary>;
    fn get_summary(&self, id: SummaryId) -> Result<Option<WeeklySummary>>;
    /// Newest `week_start` first; same-week summaries newest first.
    fn list_summaries(&self) -> Result<Vec<WeeklySummary>>;
    /// Every summary whose bounds equal `week` exactly, in `list_summaries` order.
    fn summaries_for_week(&self, week: &WeekRange) -> Result<Vec<WeeklySummary>>;
    fn count_summaries(&self) -> Result<usize>;
}

/// Both stores behind one handle, as the service holds them.
pub trait JournalStore: EntryStore + SummaryStore {}

impl<T: EntryStore + SummaryStore> JournalStore for T {}
