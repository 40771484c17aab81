//! Time utility functions

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat,
    TimeZone, Utc,
};
use chrono_tz::Tz;

/// Longest DST gap we step over when resolving a local time
const MAX_GAP_STEPS: u32 = 16;

/// Parse an IANA timezone name using chrono-tz
pub fn parse_timezone(tz: &str) -> Option<Tz> {
    tz.trim().parse::<Tz>().ok()
}

/// Resolve a local wall-clock time to a UTC instant
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant. Times inside
/// a DST gap resolve to the first valid local time after the gap, searched in
/// 15 minute steps.
pub fn resolve_local(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    let mut candidate = local;
    for _ in 0..MAX_GAP_STEPS {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return Some(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => return Some(earliest.with_timezone(&Utc)),
            LocalResult::None => {
                candidate = candidate.checked_add_signed(Duration::minutes(15))?;
            }
        }
    }
    tracing::warn!(%local, timezone = %tz, "Could not resolve local time");
    None
}

/// UTC instant of local midnight of `date` in `tz`
pub fn local_midnight(tz: Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    resolve_local(tz, date.and_time(NaiveTime::MIN))
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

fn parse_naive_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Parse a date/time string into a UTC instant
///
/// Accepts RFC 3339 (offset honoured), naive date-times and plain dates; naive
/// values are interpreted as wall-clock time in `tz`.
pub fn parse_instant(s: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = parse_naive_datetime(s) {
        return resolve_local(tz, naive);
    }
    parse_naive_date(s).and_then(|date| local_midnight(tz, date))
}

/// Parse a date/time string into a calendar day as seen in `tz`
pub fn parse_day(s: &str, tz: Tz) -> Option<NaiveDate> {
    let s = s.trim();
    if let Some(date) = parse_naive_date(s) {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&tz).date_naive());
    }
    parse_naive_datetime(s).map(|naive| naive.date())
}

/// Whether the string is a plain `YYYY-MM-DD` date
pub fn is_plain_date(s: &str) -> bool {
    parse_naive_date(s.trim()).is_some()
}

/// Format as ISO 8601 with millisecond precision and `Z` suffix
pub fn to_iso_millis(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// First calendar date whose UTC midnight is at or after `instant`
pub fn ceil_to_date(instant: DateTime<Utc>) -> Option<NaiveDate> {
    let date = instant.date_naive();
    if instant.time() == NaiveTime::MIN {
        Some(date)
    } else {
        date.succ_opt()
    }
}
