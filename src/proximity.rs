//! Day-distance between "now" and a milestone date.
//!
//! Dates are treated as instants: a bare `YYYY-MM-DD` is midnight UTC, a full
//! RFC 3339 timestamp is taken as written. The millisecond delta is divided by
//! one day and rounded half-up, so `now` carrying a time of day can tip the
//! result by one.

use crate::model::ProximityResult;
use chrono::{DateTime, NaiveDate, Utc};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Parse a date or timestamp the way release feeds write them.
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Signed whole days from `from` to `to`.
pub fn difference_days(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let days = (to - from).num_milliseconds() as f64 / MILLIS_PER_DAY;
    (days + 0.5).floor() as i64
}

/// Evaluate `target` against `now` with the given threshold.
///
/// An unparseable target yields no difference and is never close.
pub fn evaluate(now: DateTime<Utc>, target: &str, threshold_days: i64) -> ProximityResult {
    let difference_days = parse_instant(target).map(|t| difference_days(now, t));
    ProximityResult {
        difference_days,
        is_close: difference_days.is_some_and(|d| d <= threshold_days),
    }
}

/// Same as [`evaluate`] with `now` given as a date string.
pub fn evaluate_str(now: &str, target: &str, threshold_days: i64) -> ProximityResult {
    match parse_instant(now) {
        Some(now) => evaluate(now, target, threshold_days),
        None => ProximityResult {
            difference_days: None,
            is_close: false,
        },
    }
}
