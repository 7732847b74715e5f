use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// A timezone-aware UTC point in time. Every `Event`'s `when`, every `Bar`'s close, and every
/// scheduled callback's due time is one of these - never a naive timestamp.
pub type Instant = DateTime<Utc>;

/// Raised when a naive (offset-less) timestamp attempts to cross a public boundary - CSV
/// ingestion, deserialization of an external order/trade payload, etc.
///
/// This must fail loudly: callers must not silently assume UTC for input
/// that didn't declare an offset.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("naive datetime '{0}' crossed a public boundary without an explicit UTC offset")]
pub struct NaiveInstantError(pub NaiveDateTime);

/// Parse an RFC3339 timestamp that must carry an explicit offset, converting it to UTC.
///
/// Used by the CSV `Bar` source to reject the common mistake of a `datetime` column
/// with no offset, rather than silently treating it as UTC or local time.
pub fn parse_offset_datetime(raw: &str) -> Result<Instant, NaiveInstantError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| NaiveInstantError(NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").unwrap_or_default()))
}
