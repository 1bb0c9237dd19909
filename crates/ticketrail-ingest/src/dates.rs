// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical date and timestamp extraction.
//!
//! Candidate keys are scanned in configured order; the first one yielding a
//! valid value wins. Text values must start with a `YYYY-MM-DD` calendar date,
//! numeric values are epoch milliseconds (UTC).

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use ticketrail_config::MissingDatePolicy;

use crate::flatten::{FlatRecord, FlatValue};

/// Source label recorded when no candidate produced a date.
pub const FALLBACK_SOURCE: &str = "fallback";

static LEADING_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{4})-(\d{2})-(\d{2})").unwrap());

/// The canonical date of a record plus the key it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalDate {
    /// `YYYY-MM-DD`, or empty under [`MissingDatePolicy::Empty`].
    pub date: String,
    /// Candidate key that produced the date, or [`FALLBACK_SOURCE`].
    pub source: String,
}

impl CanonicalDate {
    pub fn is_fallback(&self) -> bool {
        self.source == FALLBACK_SOURCE
    }
}

/// Parses the leading `YYYY-MM-DD` of a string as a calendar date.
pub fn date_from_text(text: &str) -> Option<NaiveDate> {
    let caps = LEADING_DATE.captures(text)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Converts epoch milliseconds to a UTC timestamp.
pub fn timestamp_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

fn number_millis(n: &serde_json::Number) -> Option<i64> {
    n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))
}

/// Date carried by a flat value, if any.
pub fn date_of(value: &FlatValue) -> Option<NaiveDate> {
    match value {
        FlatValue::Text(s) => date_from_text(s),
        FlatValue::Number(n) => number_millis(n)
            .and_then(timestamp_from_millis)
            .map(|ts| ts.date_naive()),
        _ => None,
    }
}

/// Parses a full timestamp from text: RFC 3339, naive date-times (UTC
/// assumed), or a bare date (midnight UTC).
pub fn timestamp_from_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    // Offsets without a colon (e.g. `+0000`) are common in platform payloads.
    if let Ok(ts) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Full timestamp carried by a flat value, if any.
pub fn timestamp_of(value: &FlatValue) -> Option<DateTime<Utc>> {
    match value {
        FlatValue::Text(s) => timestamp_from_text(s),
        FlatValue::Number(n) => number_millis(n).and_then(timestamp_from_millis),
        _ => None,
    }
}

/// Canonical date of a flattened record.
///
/// Falls back to `today` (or to an empty date, per `policy`) when no
/// candidate yields a valid date.
pub fn canonical_date(
    record: &FlatRecord,
    candidates: &[String],
    policy: MissingDatePolicy,
    today: NaiveDate,
) -> CanonicalDate {
    for key in candidates {
        if let Some(date) = record.get(key).and_then(date_of) {
            return CanonicalDate {
                date: date.format("%Y-%m-%d").to_string(),
                source: key.clone(),
            };
        }
    }
    let date = match policy {
        MissingDatePolicy::Today => today.format("%Y-%m-%d").to_string(),
        MissingDatePolicy::Empty => String::new(),
    };
    CanonicalDate {
        date,
        source: FALLBACK_SOURCE.to_string(),
    }
}

/// First full timestamp found among the candidate keys.
pub fn record_timestamp(record: &FlatRecord, candidates: &[String]) -> Option<DateTime<Utc>> {
    candidates
        .iter()
        .find_map(|key| record.get(key).and_then(timestamp_of))
}

/// Date of an already-exported row whose cells are all text.
///
/// Used when re-reading raw exports that predate the `canonical_date`
/// column. All-digit cells are read as epoch milliseconds. There is no
/// fallback: `None` means the row has no usable date.
pub fn row_date<'a>(
    lookup: impl Fn(&str) -> Option<&'a str>,
    candidates: &[String],
) -> Option<NaiveDate> {
    candidates.iter().find_map(|key| {
        let cell = lookup(key)?.trim();
        if !cell.is_empty() && cell.bytes().all(|b| b.is_ascii_digit()) {
            cell.parse::<i64>()
                .ok()
                .and_then(timestamp_from_millis)
                .map(|ts| ts.date_naive())
        } else {
            date_from_text(cell)
        }
    })
}
