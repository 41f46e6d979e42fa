//! In-memory representation of a single GELF message.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::severity::Severity;

/// A decoded GELF message.
///
/// Strings left empty were absent (or empty) in the payload, numbers left at
/// zero were absent or not numeric.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    pub version: String,
    pub host: String,
    pub short: String,
    pub full: String,
    /// Seconds since the unix epoch, fractional part included.
    pub time_unix: f64,
    pub level: i32,
    pub facility: String,
    pub file: String,
    pub line: i32,
    /// Additional fields, keyed without their leading underscore. `None`
    /// unless the payload carried at least one.
    pub extra: Option<Map<String, Value>>,
}

impl Message {
    /// The message text, `full` if the sender provided one and `short`
    /// otherwise.
    pub fn body(&self) -> &str {
        if self.full.is_empty() {
            &self.short
        } else {
            &self.full
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        if self.time_unix == 0.0 || !self.time_unix.is_finite() {
            return None;
        }

        let secs = self.time_unix.floor();
        let nanos = ((self.time_unix - secs) * 1e9).round().min(999_999_999.0) as u32;

        DateTime::from_timestamp(secs as i64, nanos)
    }

    /// Syslog severity of `level`, if it is one.
    pub fn severity(&self) -> Option<Severity> {
        Severity::try_from(self.level).ok()
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.as_ref().and_then(|extra| extra.get(key))
    }
}
