//! Time utilities: permissive WMS timestamp parsing and warehouse-local days.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{BacktestError, Result};

/// Parse an ISO-8601-ish timestamp as the WMS emits them.
///
/// Permissive in one direction only: empty strings, literal "null" and
/// anything unparseable map to `None`, never an error. Offset-less
/// timestamps are taken as UTC.
pub fn parse_wms_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("null") {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // "2024-03-07T08:15:00" / "2024-03-07 08:15:00" without an offset.
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    None
}

/// Parse a wave date, accepting a bare date or a full timestamp.
pub fn parse_wms_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("null") {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    parse_wms_timestamp(s).map(|dt| dt.date_naive())
}

/// Resolve an IANA timezone name like "Europe/Riga".
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| BacktestError::InvalidInput(format!("invalid timezone: {name}")))
}

/// Calendar day of an instant in the warehouse timezone.
pub fn local_day(at: DateTime<Utc>, tz: Tz) -> NaiveDate {
    at.with_timezone(&tz).date_naive()
}
