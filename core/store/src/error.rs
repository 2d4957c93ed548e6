use thiserror::Error;
use weekly_journal_schemas::InvalidDateError;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failures surfaced by the entry and summary stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required field was missing or empty.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    InvalidDate(#[from] InvalidDateError),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Client-side mistakes, as opposed to persistence failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_) | StoreError::InvalidDate(_))
    }
}
