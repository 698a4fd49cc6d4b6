//! Wall-clock timestamps in Unix nanoseconds

use chrono::Utc;

/// Current time in Unix nanos
///
/// Falls back to 0 outside the representable range (after year 2262).
pub fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}
