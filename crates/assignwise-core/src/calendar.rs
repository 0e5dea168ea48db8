//! # Calendar Utility
//!
//! Elapsed business-day counts for SLA reporting.
//!
//! Dates are plain calendar dates: no time component, no time-zone
//! conversion.

use crate::AssignwiseError;
use chrono::{DateTime, Datelike, NaiveDate, Weekday};

/// Number of days from `start` to `end`, both inclusive, minus the
/// Saturdays and Sundays walked over.
///
/// The walk starts at `start` and stops before `end`, decrementing the raw
/// day difference for each weekend day; the final `+ 1` makes the range
/// inclusive. A weekend `end` is therefore counted, while a weekend `start`
/// is removed by the walk and then restored by the `+ 1`:
///
/// ```
/// use assignwise_core::calendar::business_days_between;
/// use chrono::NaiveDate;
///
/// let mon = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
/// let fri = NaiveDate::from_ymd_opt(2024, 1, 5).expect("date");
/// let next_mon = NaiveDate::from_ymd_opt(2024, 1, 8).expect("date");
///
/// assert_eq!(business_days_between(mon, fri), 5);
/// assert_eq!(business_days_between(fri, next_mon), 2);
/// ```
///
/// Only meaningful for `start <= end`; otherwise no day is walked and the
/// result is the (non-positive) raw difference plus one.
#[must_use]
pub fn business_days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    let raw = end.signed_duration_since(start).num_days();

    let weekend_days = start
        .iter_days()
        .take_while(|day| *day < end)
        .filter(|day| is_weekend(day.weekday()))
        .count() as i64;

    raw - weekend_days + 1
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Parse an ISO-8601 date (`2024-01-05`) or date-time
/// (`2024-01-05T09:30:00Z`), keeping only the calendar date.
pub fn parse_iso_date(raw: &str) -> Result<NaiveDate, AssignwiseError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed).map(|dt| dt.date_naive()))
        .map_err(|_| AssignwiseError::InvalidDate(raw.to_string()))
}

/// Render a date the way the store expects it.
#[must_use]
pub fn format_iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    #[test]
    fn monday_to_friday_is_five() {
        assert_eq!(business_days_between(d(2024, 1, 1), d(2024, 1, 5)), 5);
    }

    #[test]
    fn friday_to_monday_skips_weekend() {
        assert_eq!(business_days_between(d(2024, 1, 5), d(2024, 1, 8)), 2);
    }

    #[test]
    fn same_day_is_one() {
        assert_eq!(business_days_between(d(2024, 1, 3), d(2024, 1, 3)), 1);
    }

    #[test]
    fn weekend_start_is_restored_by_inclusive_end() {
        // Sat -> Mon: raw 2, walk drops Sat and Sun, +1 => 1
        assert_eq!(business_days_between(d(2024, 1, 6), d(2024, 1, 8)), 1);
        // Sat -> Sat: nothing walked, +1 => 1
        assert_eq!(business_days_between(d(2024, 1, 6), d(2024, 1, 6)), 1);
    }

    #[test]
    fn weekend_end_is_counted() {
        // Fri -> Sat: raw 1, walk only visits Fri, +1 => 2
        assert_eq!(business_days_between(d(2024, 1, 5), d(2024, 1, 6)), 2);
    }

    #[test]
    fn two_full_weeks() {
        // Mon -> Fri of the following week
        assert_eq!(business_days_between(d(2024, 1, 1), d(2024, 1, 12)), 10);
    }

    #[test]
    fn reversed_range_is_not_positive() {
        assert!(business_days_between(d(2024, 1, 8), d(2024, 1, 1)) <= 0);
    }

    #[test]
    fn parse_date_and_datetime() {
        assert_eq!(parse_iso_date("2024-01-05").expect("date"), d(2024, 1, 5));
        assert_eq!(
            parse_iso_date("2024-01-05T09:30:00Z").expect("datetime"),
            d(2024, 1, 5)
        );
        assert!(matches!(
            parse_iso_date("yesterday"),
            Err(AssignwiseError::InvalidDate(_))
        ));
    }

    #[test]
    fn format_roundtrips() {
        let date = d(2024, 2, 29);
        assert_eq!(format_iso_date(date), "2024-02-29");
        assert_eq!(parse_iso_date(&format_iso_date(date)).expect("parse"), date);
    }
}
