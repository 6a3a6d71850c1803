// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Timestamps are stored and returned as RFC3339 strings with a `Z` suffix,
//! so lexical order in the store matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};

pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time, formatted for storage.
pub fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_is_sortable() {
        let early = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 11, 12, 17, 30, 5).unwrap();

        assert_eq!(format_utc_rfc3339(early), "2026-03-01T08:00:00Z");
        assert!(format_utc_rfc3339(early) < format_utc_rfc3339(late));
    }
}
