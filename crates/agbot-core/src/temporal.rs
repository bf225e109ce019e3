//! # Temporal Types
//!
//! UTC-only timestamp stamped on cached policy entries. Serialized with
//! second precision and a `Z` suffix.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// A UTC timestamp with second-level precision in its string forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current UTC time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// ISO 8601 with Z suffix, truncated to seconds.
    pub fn to_canonical_string(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn canonical_string_truncates_subseconds() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
            + chrono::Duration::milliseconds(750);
        let ts = Timestamp(dt);
        assert_eq!(ts.to_string(), "2026-01-15T12:00:00Z");
        assert_eq!(
            serde_json::to_value(ts).unwrap(),
            serde_json::json!("2026-01-15T12:00:00Z")
        );
    }

    #[test]
    fn now_is_ordered() {
        let first = Timestamp::now();
        let second = Timestamp::now();
        assert!(first <= second);
    }
}
