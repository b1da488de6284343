use chrono::{DateTime, Utc};

/// Convert a unix timestamp in seconds. Provider series sometimes carry
/// fractional or stringly-typed seconds, callers normalise before this.
pub fn from_unix_timestamp(timestamp: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp, 0)
}

/// Convert timestamp to human readable format
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Age of `timestamp` in whole seconds, never negative.
pub fn age_seconds(timestamp: DateTime<Utc>) -> i64 {
    (Utc::now() - timestamp).num_seconds().max(0)
}
