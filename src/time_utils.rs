// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and timestamp units.
//!
//! Milliseconds since the Unix epoch is the only unit stored for token
//! expiry. Providers that report seconds are normalized here.

use chrono::{DateTime, SecondsFormat, Utc};

/// Epoch values below this are treated as seconds (10^11 ms is March 1973,
/// 10^11 s is the year 5138).
pub const SECONDS_THRESHOLD: i64 = 100_000_000_000;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert a provider epoch-seconds value to milliseconds.
pub fn seconds_to_millis(secs: i64) -> i64 {
    secs.saturating_mul(1000)
}

/// Normalize an epoch timestamp of unknown unit to milliseconds.
pub fn normalize_epoch_millis(value: i64) -> i64 {
    if value.abs() < SECONDS_THRESHOLD {
        seconds_to_millis(value)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_seconds() {
        assert_eq!(normalize_epoch_millis(1_700_000_000), 1_700_000_000_000);
    }

    #[test]
    fn test_normalize_millis_unchanged() {
        assert_eq!(normalize_epoch_millis(1_700_000_000_123), 1_700_000_000_123);
    }

    #[test]
    fn test_format_rfc3339_z_suffix() {
        let date = DateTime::from_timestamp(0, 0).unwrap();
        assert_eq!(format_utc_rfc3339(date), "1970-01-01T00:00:00Z");
    }
}
