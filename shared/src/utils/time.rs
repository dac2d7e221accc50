//! Time-related utilities

use chrono::{DateTime, SecondsFormat, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current system time in milliseconds since UNIX epoch
pub fn system_time_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Format epoch milliseconds as an RFC3339 UTC timestamp.
///
/// Sub-second digits are only printed when non-zero, in groups of three.
/// Returns `None` when the value is outside the representable range.
pub fn format_epoch_millis(millis: f64) -> Option<String> {
    if !millis.is_finite() {
        return None;
    }
    let whole = millis.trunc() as i64;
    let nanos = ((millis - millis.trunc()) * 1_000_000.0).round() as i64;
    let ts = DateTime::<Utc>::from_timestamp_millis(whole)?
        + chrono::Duration::nanoseconds(nanos);
    Some(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}
