//! Calendar week resolution
//!
//! Weeks run Monday through Sunday. Both bounds are carried as fixed-width,
//! zero-padded `YYYY-MM-DD` strings; range queries in the store compare dates
//! lexicographically, which is only correct on exactly this format.

use chrono::{DateTime, Datelike, Days, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidDateError {
    #[error("invalid date `{0}`: expected YYYY-MM-DD")]
    Malformed(String),
    #[error("date `{0}` is outside the supported calendar range")]
    OutOfRange(String),
}

/// A Monday-to-Sunday span identified by its two boundary dates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekRange {
    pub start: String,
    pub end: String,
}

impl WeekRange {
    /// Build a range from raw bounds. No check that they form a real week.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Closed-interval check on the `YYYY-MM-DD` string form.
    pub fn contains(&self, date: &str) -> bool {
        self.start.as_str() <= date && date <= self.end.as_str()
    }

    pub fn next(&self) -> Result<WeekRange, InvalidDateError> {
        let start = parse_date(&self.start)?;
        let next = start
            .checked_add_days(Days::new(7))
            .ok_or_else(|| InvalidDateError::OutOfRange(self.start.clone()))?;
        week_range_of(next)
    }

    pub fn previous(&self) -> Result<WeekRange, InvalidDateError> {
        let start = parse_date(&self.start)?;
        let previous = start
            .checked_sub_days(Days::new(7))
            .ok_or_else(|| InvalidDateError::OutOfRange(self.start.clone()))?;
        week_range_of(previous)
    }
}

impl fmt::Display for WeekRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Parse a strict `YYYY-MM-DD` date. Non-padded forms such as `2024-6-1` are rejected.
pub fn parse_date(input: &str) -> Result<NaiveDate, InvalidDateError> {
    if !DATE_RE.is_match(input) {
        return Err(InvalidDateError::Malformed(input.to_string()));
    }

    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .map_err(|_| InvalidDateError::Malformed(input.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// The server's current calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Map a date to the Monday-Sunday week containing it.
pub fn week_range_of(reference: NaiveDate) -> Result<WeekRange, InvalidDateError> {
    // Sunday = 0 .. Saturday = 6
    let day_of_week = reference.weekday().num_days_from_sunday();
    let diff_to_monday = if day_of_week == 0 { 6 } else { day_of_week - 1 };

    let out_of_range = || InvalidDateError::OutOfRange(format_date(reference));

    let monday = reference
        .checked_sub_days(Days::new(u64::from(diff_to_monday)))
        .ok_or_else(out_of_range)?;
    let sunday = monday
        .checked_add_days(Days::new(6))
        .ok_or_else(out_of_range)?;

    Ok(WeekRange {
        start: format_date(monday),
        end: format_date(sunday),
    })
}

/// Like [`week_range_of`], for a `YYYY-MM-DD` date or an RFC 3339 timestamp.
/// Timestamps keep the calendar date as written; time and offset are dropped.
pub fn week_range_of_str(input: &str) -> Result<WeekRange, InvalidDateError> {
    let trimmed = input.trim();

    let date = match parse_date(trimmed) {
        Ok(date) => date,
        Err(err) => match DateTime::parse_from_rfc3339(trimmed) {
            Ok(timestamp) => timestamp.date_naive(),
            Err(_) => return Err(err),
        },
    };

    week_range_of(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_monday_starts_its_own_week() {
        let week = week_range_of(date("2024-06-10")).unwrap();
        assert_eq!(week, WeekRange::new("2024-06-10", "2024-06-16"));
    }

    #[test]
    fn test_sunday_belongs_to_previous_monday() {
        let week = week_range_of(date("2024-06-16")).unwrap();
        assert_eq!(week, WeekRange::new("2024-06-10", "2024-06-16"));
    }

    #[test]
    fn test_week_spanning_month_and_year_boundaries() {
        let week = week_range_of(date("2025-01-01")).unwrap();
        assert_eq!(week, WeekRange::new("2024-12-30", "2025-01-05"));

        let leap = week_range_of(date("2024-02-29")).unwrap();
        assert_eq!(leap, WeekRange::new("2024-02-26", "2024-03-03"));
    }

    #[test]
    fn test_every_day_of_a_span_shares_one_week() {
        let monday = date("2024-06-10");
        let expected = week_range_of(monday).unwrap();

        for offset in 0..7 {
            let day = monday.checked_add_days(Days::new(offset)).unwrap();
            assert_eq!(week_range_of(day).unwrap(), expected, "offset {}", offset);
        }

        let next_monday = monday.checked_add_days(Days::new(7)).unwrap();
        assert_ne!(week_range_of(next_monday).unwrap(), expected);
    }

    #[test]
    fn test_start_is_monday_and_end_is_six_days_later() {
        let mut day = date("2023-12-01");
        for _ in 0..400 {
            let week = week_range_of(day).unwrap();
            let start = parse_date(&week.start).unwrap();
            let end = parse_date(&week.end).unwrap();

            assert_eq!(start.weekday(), Weekday::Mon);
            assert_eq!((end - start).num_days(), 6);
            assert!(week.contains(&format_date(day)));

            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_parse_date_rejects_unpadded_and_bogus_dates() {
        assert!(parse_date("2024-06-10").is_ok());
        assert!(matches!(
            parse_date("2024-6-1"),
            Err(InvalidDateError::Malformed(_))
        ));
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("").is_err());
        assert!(parse_date("10/06/2024").is_err());
    }

    #[test]
    fn test_week_range_of_str_strips_time_component() {
        let week = week_range_of_str("2024-06-12T23:30:00+02:00").unwrap();
        assert_eq!(week, WeekRange::new("2024-06-10", "2024-06-16"));

        assert!(week_range_of_str("not a date").is_err());
    }

    #[test]
    fn test_contains_is_inclusive_on_both_bounds() {
        let week = WeekRange::new("2024-06-10", "2024-06-16");
        assert!(week.contains("2024-06-10"));
        assert!(week.contains("2024-06-16"));
        assert!(!week.contains("2024-06-09"));
        assert!(!week.contains("2024-06-17"));
    }

    #[test]
    fn test_next_and_previous_weeks() {
        let week = WeekRange::new("2024-12-30", "2025-01-05");
        assert_eq!(week.next().unwrap(), WeekRange::new("2025-01-06", "2025-01-12"));
        assert_eq!(
            week.previous().unwrap(),
            WeekRange::new("2024-12-23", "2024-12-29")
        );
    }
}
