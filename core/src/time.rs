//! Time related utils.

use chrono::TimeZone;
use chrono::Utc;

use crate::Error;

/// DateTime is the alias of `chrono::DateTime<Utc>`.
pub type DateTime = chrono::DateTime<Utc>;

/// Create the current time in UTC.
pub fn now() -> DateTime {
    Utc::now()
}

/// Add `secs` seconds to `time`, saturating at the representable bounds.
pub fn add_secs(time: DateTime, secs: i64) -> DateTime {
    let bound = if secs < 0 {
        DateTime::MIN_UTC
    } else {
        DateTime::MAX_UTC
    };
    chrono::TimeDelta::try_seconds(secs)
        .and_then(|delta| time.checked_add_signed(delta))
        .unwrap_or(bound)
}

/// Convert unix timestamp (seconds) into DateTime.
pub fn from_unix(secs: i64) -> crate::Result<DateTime> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| Error::unexpected(format!("invalid unix timestamp: {secs}")))
}
