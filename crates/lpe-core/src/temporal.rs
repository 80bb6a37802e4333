//! # Temporal Types — UTC-Only Timestamps
//!
//! Expiration dates are compared in UTC. [`Timestamp`] stores a
//! `DateTime<Utc>` truncated to whole seconds and always renders as
//! `YYYY-MM-DDTHH:MM:SSZ`, which keeps canonical activation payloads stable.
//! Every constructor keeps the value within years 0000 to 9999, the range that
//! rendering can express with a four-digit year.
//!
//! Three parsers are provided:
//!
//! - [`Timestamp::parse()`]: strict RFC 3339 with a `Z` suffix. Used by the
//!   activation codec, where any other rendering means the code was not
//!   produced by this system.
//! - [`Timestamp::parse_lenient()`]: RFC 3339 with any offset, converted to
//!   UTC. Used when ingesting records from external stores.
//! - [`Timestamp::parse_flexible()`]: additionally accepts a bare
//!   `YYYY-MM-DD` date (midnight UTC). Used to coerce rule literals such as
//!   `expiration_date less than 2020-01-01`.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Epoch seconds of `0000-01-01T00:00:00Z`, the earliest timestamp.
    pub const MIN_EPOCH_SECS: i64 = -62_167_219_200;
    /// Epoch seconds of `9999-12-31T23:59:59Z`, the latest timestamp.
    pub const MAX_EPOCH_SECS: i64 = 253_402_300_799;

    /// Current UTC time, truncated.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// From a `chrono::DateTime<Utc>`, truncating sub-seconds and clamping
    /// to the supported range.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        let secs = dt.timestamp();
        let clamped = secs.clamp(Self::MIN_EPOCH_SECS, Self::MAX_EPOCH_SECS);
        if clamped == secs {
            return Self(truncate_to_seconds(dt));
        }
        DateTime::from_timestamp(clamped, 0).map_or(Self(truncate_to_seconds(dt)), Self)
    }

    fn bounded(dt: DateTime<Utc>, input: &str) -> Result<Self, CoreError> {
        if (Self::MIN_EPOCH_SECS..=Self::MAX_EPOCH_SECS).contains(&dt.timestamp()) {
            Ok(Self(truncate_to_seconds(dt)))
        } else {
            Err(CoreError::InvalidTimestamp(format!(
                "{input} is outside years 0000-9999"
            )))
        }
    }

    /// Parse an RFC 3339 string that uses the `Z` suffix.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTimestamp` for malformed input or any
    /// explicit offset (including `+00:00`).
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if !s.ends_with('Z') {
            return Err(CoreError::InvalidTimestamp(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        Self::parse_lenient(s)
    }

    /// Parse an RFC 3339 string with any offset, converting to UTC.
    pub fn parse_lenient(s: &str) -> Result<Self, CoreError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            CoreError::InvalidTimestamp(format!("invalid RFC 3339 timestamp {s:?}: {e}"))
        })?;
        Self::bounded(dt.with_timezone(&Utc), s)
    }

    /// Parse either a calendar date (`YYYY-MM-DD`, midnight UTC) or an
    /// RFC 3339 timestamp with any offset.
    pub fn parse_flexible(s: &str) -> Result<Self, CoreError> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
                CoreError::InvalidTimestamp(format!("date out of range: {s:?}"))
            })?;
            return Self::bounded(midnight.and_utc(), s);
        }
        Self::parse_lenient(s)
    }

    /// From a Unix epoch timestamp (seconds).
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTimestamp` outside
    /// [`MIN_EPOCH_SECS`](Self::MIN_EPOCH_SECS)..=[`MAX_EPOCH_SECS`](Self::MAX_EPOCH_SECS).
    pub fn from_epoch_secs(secs: i64) -> Result<Self, CoreError> {
        let dt = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| CoreError::InvalidTimestamp(format!("invalid Unix timestamp: {secs}")))?;
        Self::bounded(dt, &format!("Unix timestamp {secs}"))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// This instant shifted by a whole number of days. Saturates at the
    /// supported range.
    pub fn plus_days(&self, days: i64) -> Self {
        let secs = days
            .saturating_mul(86_400)
            .saturating_add(self.epoch_secs())
            .clamp(Self::MIN_EPOCH_SECS, Self::MAX_EPOCH_SECS);
        Self::from_epoch_secs(secs).unwrap_or(*self)
    }

    /// Render as ISO 8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl std::str::FromStr for Timestamp {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_flexible(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_flexible(&s).map_err(serde::de::Error::custom)
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
