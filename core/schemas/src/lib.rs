use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub mod calendar;

pub use calendar::{
    format_date, parse_date, today, week_range_of, week_range_of_str, InvalidDateError, WeekRange,
    DATE_FORMAT,
};

// ============================================================================
// ID Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SummaryId(pub i64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SummaryId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Journal Entry Schema
// ============================================================================

/// One dated journal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: EntryId,
    pub date: String, // YYYY-MM-DD
    #[serde(rename = "whatIDid")]
    pub what_i_did: String,
    #[serde(rename = "whatILearned")]
    pub what_i_learned: String,
}

/// The mutable fields of an entry, used for both add and full-replacement update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub date: String,
    #[serde(rename = "whatIDid", default, deserialize_with = "null_as_empty")]
    pub what_i_did: String,
    #[serde(rename = "whatILearned", default, deserialize_with = "null_as_empty")]
    pub what_i_learned: String,
}

impl NewEntry {
    pub fn new(
        date: impl Into<String>,
        what_i_did: impl Into<String>,
        what_i_learned: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            what_i_did: what_i_did.into(),
            what_i_learned: what_i_learned.into(),
        }
    }
}

// ============================================================================
// Weekly Summary Schema
// ============================================================================

/// Recap text for one week. Append-only: several may exist for the same week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub id: SummaryId,
    pub week_start: String, // YYYY-MM-DD
    pub week_end: String,   // YYYY-MM-DD
    pub summary: String,
    pub created_at: String, // RFC3339
}

impl WeeklySummary {
    /// Whether this summary was saved for exactly `week`.
    pub fn covers(&self, week: &WeekRange) -> bool {
        self.week_start == week.start && self.week_end == week.end
    }
}

/// Entries and summaries that fall into one calendar week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekBucket {
    pub week: WeekRange,
    pub entries: Vec<JournalEntry>,
    pub summaries: Vec<WeeklySummary>,
}

// ============================================================================
// API Request/Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryCreated {
    pub id: EntryId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Absent and `null` string fields both read as empty, so validation decides the answer.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// Missing fields deserialize as empty strings so the API can answer 400 instead of 422.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveSummaryRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub week_start: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub week_end: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub summary: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateSummaryRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub week_start: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub week_end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSummary {
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Generated text that could not be persisted, returned so the caller can retry the save.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub summary: Option<String>,
}
