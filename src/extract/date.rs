//! Post timestamp resolution
//!
//! Posts carry either an explicit long-form date
//! (`March 01, 2023, 11:59:59 PM`) or a relative one (`Today at 02:30:00 PM`,
//! `Yesterday at 09:00:00 AM`). Relative dates borrow their calendar day from
//! the page-level reference date, which is read once per page.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const MONTHS: &str =
    "January|February|March|April|May|June|July|August|September|October|November|December";

static EXPLICIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<month>{MONTHS})\s+(?P<day>\d{{1,2}}),\s*(?P<year>\d{{4}}),\s*(?P<h>\d{{1,2}}):(?P<m>\d{{2}}):(?P<s>\d{{2}})\s*(?P<ampm>AM|PM)\b"
    ))
    .unwrap()
});

static RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?P<day>Today|Yesterday)\s+at\s+(?P<h>\d{1,2}):(?P<m>\d{2}):(?P<s>\d{2})\s*(?P<ampm>AM|PM)\b",
    )
    .unwrap()
});

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<month>{MONTHS})\s+(?P<day>\d{{1,2}}),\s*(?P<year>\d{{4}})\b"
    ))
    .unwrap()
});

/// Why a date string could not be turned into a timestamp
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("unrecognized date: {0:?}")]
    Unrecognized(String),

    #[error("relative date {0:?} but the page has no reference date")]
    NoReference(String),

    #[error("date out of range: {0:?}")]
    OutOfRange(String),
}

/// Reads the calendar date out of the page-level reference text
///
/// # Example
///
/// ```
/// use forum_harvest::extract::parse_reference_date;
/// use chrono::NaiveDate;
///
/// let today = parse_reference_date("April 05, 2024, 09:12:44 AM");
/// assert_eq!(today, NaiveDate::from_ymd_opt(2024, 4, 5));
/// ```
pub fn parse_reference_date(text: &str) -> Option<NaiveDate> {
    let caps = REFERENCE.captures(text)?;
    NaiveDate::from_ymd_opt(
        caps["year"].parse().ok()?,
        month_number(&caps["month"])?,
        caps["day"].parse().ok()?,
    )
}

/// Resolves one post's date string into a timestamp
///
/// Explicit dates use their own day, month and year. Relative dates take the
/// calendar day from `reference` (minus one day for "Yesterday") and only
/// supply the time of day.
pub fn resolve_timestamp(
    raw: &str,
    reference: Option<NaiveDate>,
) -> Result<NaiveDateTime, DateError> {
    if let Some(caps) = EXPLICIT.captures(raw) {
        let out_of_range = || DateError::OutOfRange(raw.to_string());
        let date = NaiveDate::from_ymd_opt(
            caps["year"].parse().map_err(|_| out_of_range())?,
            month_number(&caps["month"]).ok_or_else(out_of_range)?,
            caps["day"].parse().map_err(|_| out_of_range())?,
        )
        .ok_or_else(out_of_range)?;
        let time = clock_time(&caps["h"], &caps["m"], &caps["s"], &caps["ampm"])
            .ok_or_else(out_of_range)?;
        return Ok(date.and_time(time));
    }

    if let Some(caps) = RELATIVE.captures(raw) {
        let today = reference.ok_or_else(|| DateError::NoReference(raw.to_string()))?;
        let date = if caps["day"].eq_ignore_ascii_case("yesterday") {
            today - Duration::days(1)
        } else {
            today
        };
        let time = clock_time(&caps["h"], &caps["m"], &caps["s"], &caps["ampm"])
            .ok_or_else(|| DateError::OutOfRange(raw.to_string()))?;
        return Ok(date.and_time(time));
    }

    Err(DateError::Unrecognized(raw.trim().to_string()))
}

/// Converts a 12-hour clock hour to 24-hour; 12 AM is midnight
pub fn to_24_hour(hour: u32, pm: bool) -> Option<u32> {
    match (hour, pm) {
        (1..=11, false) => Some(hour),
        (12, false) => Some(0),
        (1..=11, true) => Some(hour + 12),
        (12, true) => Some(12),
        _ => None,
    }
}

fn clock_time(h: &str, m: &str, s: &str, ampm: &str) -> Option<NaiveTime> {
    let hour = to_24_hour(h.parse().ok()?, ampm.eq_ignore_ascii_case("PM"))?;
    NaiveTime::from_hms_opt(hour, m.parse().ok()?, s.parse().ok()?)
}

fn month_number(name: &str) -> Option<u32> {
    MONTHS
        .split('|')
        .position(|month| month.eq_ignore_ascii_case(name))
        .map(|index| index as u32 + 1)
}
