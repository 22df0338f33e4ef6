use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// RFC 3339 UTC timestamp with second precision.
///
/// This is the canonical time representation across the engine: snapshot
/// signing covers the rendered string, so rendering must be deterministic.
/// Sub-second components are truncated, never rounded.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current wall-clock time, truncated to whole seconds.
    pub fn now() -> Self {
        Self::from_epoch_secs(Utc::now().timestamp())
    }

    /// Construct from epoch seconds.
    pub fn from_epoch_secs(secs: i64) -> Self {
        Self(DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH))
    }

    /// Seconds since the UNIX epoch.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Canonical RFC 3339 rendering, e.g. `2024-05-01T12:30:00Z`.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Parse from an RFC 3339 string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| TypeError::InvalidTimestamp(e.to_string()))?;
        Ok(Self::from_epoch_secs(dt.timestamp()))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.to_rfc3339())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}
