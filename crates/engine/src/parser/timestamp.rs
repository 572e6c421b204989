//! Timestamp — the bracketed `06/Nov/2025:14:30:15 +0800` request time.

use chrono::{DateTime, FixedOffset};

use super::model::FailureReason;

pub const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Parse a log timestamp, keeping the zone offset written in the line.
pub fn parse_timestamp(raw: &[u8]) -> Result<DateTime<FixedOffset>, FailureReason> {
    let text = std::str::from_utf8(raw).map_err(|_| FailureReason::TimestampParse)?;
    DateTime::parse_from_str(text, TIMESTAMP_FORMAT).map_err(|_| FailureReason::TimestampParse)
}

pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}
