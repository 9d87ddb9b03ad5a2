//! UTC timestamps for durable records.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A UTC timestamp.
///
/// Stored as RFC 3339 text so records stay readable in the database and
/// sortable as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// The current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// RFC 3339 storage form (millisecond precision).
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Parse the storage form.
    #[must_use]
    pub fn parse_rfc3339(s: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let ts = Timestamp::now();
        let parsed = Timestamp::parse_rfc3339(&ts.to_rfc3339()).unwrap();
        // Millisecond precision is preserved through storage
        assert_eq!(parsed.to_rfc3339(), ts.to_rfc3339());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Timestamp::parse_rfc3339("yesterday").is_none());
    }

    #[test]
    fn test_ordering() {
        let a = Timestamp::parse_rfc3339("2026-01-01T00:00:00Z").unwrap();
        let b = Timestamp::parse_rfc3339("2026-01-02T00:00:00Z").unwrap();
        assert!(a < b);
    }
}
